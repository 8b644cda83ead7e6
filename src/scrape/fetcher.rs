use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;

use crate::error::Result;

const USER_AGENT_STRING: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_STRING: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_STRING: &str = "ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3";

/// Downloads listing pages with a desktop-browser header set. No retries.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_STRING));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_STRING));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Returns the page body, or an error for network failures, timeouts and non-2xx statuses.
    pub async fn fetch_page(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch page: HTTP {}", response.status()).into());
        }

        let body = response.text().await?;
        tracing::debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

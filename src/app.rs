use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::Local;
use rand::Rng;
use url::Url;

use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{NewNews, UpsertPolicy, UpsertReport};
use crate::normalize::normalize;
use crate::scrape::{Extractor, PageFetcher, Source, SOURCES};
use crate::services::{export_records, ExportPaths, NewsCatalog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    pub source: &'static str,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub candidates: usize,
    pub upsert: UpsertReport,
}

impl ScrapeReport {
    fn new(source: &'static str) -> Self {
        Self {
            source,
            pages_fetched: 0,
            pages_failed: 0,
            candidates: 0,
            upsert: UpsertReport::default(),
        }
    }
}

impl fmt::Display for ScrapeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} pages ({} failed), {} news, {} new, {} updated, {} skipped",
            self.source,
            self.pages_fetched,
            self.pages_failed,
            self.candidates,
            self.upsert.inserted,
            self.upsert.updated,
            self.upsert.skipped,
        )
    }
}

pub struct App {
    pub config: Config,
    pub repository: Repository,
    fetcher: PageFetcher,
    extractor: Extractor,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        Self::with_repository(config, repository)
    }

    pub fn with_repository(config: Config, repository: Repository) -> Result<Self> {
        let fetcher = PageFetcher::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self {
            config,
            repository,
            fetcher,
            extractor: Extractor::new()?,
        })
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn catalog(&self) -> NewsCatalog<'_> {
        NewsCatalog::new(&self.repository)
    }

    fn policy(&self) -> UpsertPolicy {
        self.config.upsert_policy
    }

    /// Walks `pages` listing pages of one source and stores what was found.
    /// Failed pages are logged and skipped.
    pub async fn scrape_source(&self, source: &'static Source, pages: u32) -> Result<ScrapeReport> {
        let base = Url::parse(source.base_url)?;
        let mut report = ScrapeReport::new(source.key);
        let mut batch = Vec::new();

        tracing::info!(source = source.key, pages, "scraping source");

        for page in 1..=pages {
            let url = source.page_url(page);
            match self.fetcher.fetch_page(&url, Some(source.base_url)).await {
                Ok(html) => {
                    let news = self.prepare(&html, source, &base);
                    tracing::info!(url = %url, count = news.len(), "page parsed");
                    report.pages_fetched += 1;
                    report.candidates += news.len();
                    batch.extend(news);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "page skipped");
                    report.pages_failed += 1;
                }
            }

            if page < pages {
                tokio::time::sleep(jitter(self.config.delay_min_secs, self.config.delay_max_secs)).await;
            }
        }

        if !batch.is_empty() {
            report.upsert = self.repository.upsert_many(batch, self.policy()).await?;
        }
        tracing::info!(source = source.key, inserted = report.upsert.inserted, "source done");
        Ok(report)
    }

    /// Every catalogued source in order. A source that fails to store is logged
    /// and the run moves on.
    pub async fn scrape_all(&self, pages: u32) -> Vec<ScrapeReport> {
        let mut reports = Vec::new();
        for (i, source) in SOURCES.iter().enumerate() {
            match self.scrape_source(source, pages).await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(source = source.key, error = %e, "source failed"),
            }

            if i + 1 < SOURCES.len() {
                tokio::time::sleep(jitter(
                    self.config.source_delay_min_secs,
                    self.config.source_delay_max_secs,
                ))
                .await;
            }
        }
        reports
    }

    /// Extract, normalize and store one already-downloaded page.
    pub async fn ingest_html(&self, html: &str, source: &Source) -> Result<UpsertReport> {
        let base = Url::parse(source.base_url)?;
        let news = self.prepare(html, source, &base);
        self.repository.upsert_many(news, self.policy()).await
    }

    fn prepare(&self, html: &str, source: &Source, base: &Url) -> Vec<NewNews> {
        let scraped_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.extractor
            .extract(html, source.layout, base)
            .into_iter()
            .filter_map(|candidate| normalize(candidate, source.league, &scraped_at))
            .collect()
    }

    /// Dumps every stored record to JSON and CSV under the configured export dir.
    pub async fn export(&self) -> Result<ExportPaths> {
        let records = self.repository.list_all().await?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        export_records(&records, Path::new(&self.config.export_dir), &stamp)
    }
}

fn jitter(min_secs: f64, max_secs: f64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs_f64(min_secs.max(0.0));
    }
    Duration::from_secs_f64(rand::rng().random_range(min_secs..=max_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsFilter;
    use crate::scrape::find_source;

    const CHAMPIONAT_PAGE: &str = r#"
        <div class="news-items">
          <div class="news-items__head">24 ноября</div>
          <div class="news-item">
            <div class="news-item__time">21:45</div>
            <a class="news-item__title" href="/football/news-1.html">Реал Мадрид обыграл Барселону в Эль Класико 24 ноября 21:45</a>
            <a class="news-item__tag" href="/football/_spain.html">Испания</a>
          </div>
          <div class="news-item">
            <a class="news-item__title" href="/football/news-2.html">Олимпиакос вышел в лидеры</a>
            <a class="news-item__tag" href="/football/_greece.html">Греция</a>
          </div>
          <div class="news-item">
            <a class="news-item__title" href="/football/news-3.html">03:12</a>
          </div>
        </div>
    "#;

    fn quiet_config() -> Config {
        Config {
            delay_min_secs: 0.0,
            delay_max_secs: 0.0,
            source_delay_min_secs: 0.0,
            source_delay_max_secs: 0.0,
            ..Config::default()
        }
    }

    async fn app(policy: UpsertPolicy) -> App {
        let config = Config {
            upsert_policy: policy,
            ..quiet_config()
        };
        App::with_repository(config, Repository::in_memory().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn ingesting_a_page_twice_keeps_one_row_per_link() {
        let app = app(UpsertPolicy::Ignore).await;
        let source = find_source("championat").unwrap();

        let first = app.ingest_html(CHAMPIONAT_PAGE, source).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = app.ingest_html(CHAMPIONAT_PAGE, source).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(app.repository.count_news(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_policy_keeps_one_row_with_latest_fields() {
        let app = app(UpsertPolicy::Update).await;
        let source = find_source("championat").unwrap();
        app.ingest_html(CHAMPIONAT_PAGE, source).await.unwrap();

        let edited = CHAMPIONAT_PAGE.replace("Олимпиакос вышел в лидеры", "Олимпиакос потерял очки");
        let report = app.ingest_html(&edited, source).await.unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(app.repository.count_news(None).await.unwrap(), 2);

        let greek = app
            .repository
            .list_news(10, NewsFilter::league("Греция"))
            .await
            .unwrap();
        assert_eq!(greek.len(), 1);
        assert_eq!(greek[0].title, "Олимпиакос потерял очки");
    }

    #[tokio::test]
    async fn stored_records_are_normalized() {
        let app = app(UpsertPolicy::Ignore).await;
        app.ingest_html(CHAMPIONAT_PAGE, find_source("championat").unwrap())
            .await
            .unwrap();

        let spain = app
            .repository
            .list_news(10, NewsFilter::league("Ла Лига"))
            .await
            .unwrap();
        assert_eq!(spain.len(), 1);
        let news = &spain[0];
        assert_eq!(news.title, "Реал Мадрид обыграл Барселону в Эль Класико");
        assert_eq!(news.club_tags, "Реал Мадрид, Реал, Барселона, Барса");
        assert_eq!(news.link, "https://www.championat.com/football/news-1.html");
        assert_eq!(news.date.as_deref(), Some("24 ноября 21:45"));
        assert_eq!(news.rubric.as_deref(), Some("Испания"));
    }

    #[tokio::test]
    async fn fixed_league_sources_tag_every_item() {
        let app = app(UpsertPolicy::Ignore).await;
        let page = r#"<div id="teazers"><ul class="list">
            <li><a href="/n/1"><span class="teaser-title">Зенит обыграл Спартак</span></a><span class="rubric">Футбол</span></li>
        </ul></div>"#;
        app.ingest_html(page, find_source("rpl").unwrap()).await.unwrap();

        let news = app.repository.list_all().await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].league.as_deref(), Some("Российская Премьер-лига"));
        assert_eq!(news[0].link, "https://news.sportbox.ru/n/1");
    }

    /// A copy of the `rpl` source pointed at `base_url`.
    fn local_source(base_url: String) -> &'static Source {
        let base_url: &'static str = Box::leak(base_url.into_boxed_str());
        Box::leak(Box::new(Source {
            key: "local",
            base_url,
            start_url: base_url,
            ..find_source("rpl").unwrap().clone()
        }))
    }

    /// Serves `page` for page 1 and answers 500 for anything else.
    async fn flaky_server(page: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let response = if request.starts_with("GET / ") {
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{page}",
                        page.len()
                    )
                } else {
                    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                };
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn unreachable_pages_are_counted_and_skipped() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let source = local_source(format!("http://127.0.0.1:{port}"));
        let app = app(UpsertPolicy::Ignore).await;

        let report = app.scrape_source(source, 2).await.unwrap();
        assert_eq!(report.pages_fetched, 0);
        assert_eq!(report.pages_failed, 2);
        assert_eq!(report.candidates, 0);
        assert_eq!(report.upsert, UpsertReport::default());
        assert_eq!(app.repository.count_news(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_page_does_not_stop_the_run() {
        const PAGE: &str = r#"<div id="teazers"><ul class="list">
            <li><a href="/n/7"><span class="teaser-title">Спартак объявил о трансфере</span></a></li>
        </ul></div>"#;
        let source = local_source(flaky_server(PAGE).await);
        let app = app(UpsertPolicy::Ignore).await;

        let report = app.scrape_source(source, 3).await.unwrap();
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.pages_failed, 2);
        assert_eq!(report.upsert.inserted, 1);

        let stored = app.repository.list_all().await.unwrap();
        assert_eq!(stored[0].club_tags, "Спартак");
        assert_eq!(stored[0].league.as_deref(), Some("Российская Премьер-лига"));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        for _ in 0..100 {
            let d = jitter(2.0, 4.0);
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4));
        }
        assert_eq!(jitter(0.0, 0.0), Duration::ZERO);
    }

    #[test]
    fn report_display_is_one_line() {
        let report = ScrapeReport {
            source: "rpl",
            pages_fetched: 2,
            pages_failed: 1,
            candidates: 30,
            upsert: UpsertReport { inserted: 20, updated: 0, skipped: 10 },
        };
        assert_eq!(
            report.to_string(),
            "rpl: 2 pages (1 failed), 30 news, 20 new, 0 updated, 10 skipped"
        );
    }
}

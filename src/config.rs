use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::UpsertPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Pages walked per source on a scrape run.
    #[serde(default = "default_pages")]
    pub pages: u32,

    #[serde(default = "default_delay_min")]
    pub delay_min_secs: f64,
    #[serde(default = "default_delay_max")]
    pub delay_max_secs: f64,

    #[serde(default = "default_source_delay_min")]
    pub source_delay_min_secs: f64,
    #[serde(default = "default_source_delay_max")]
    pub source_delay_max_secs: f64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub upsert_policy: UpsertPolicy,

    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("football-news");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("football_news.db").to_string_lossy().to_string()
}

fn default_pages() -> u32 {
    2
}

fn default_delay_min() -> f64 {
    2.0
}

fn default_delay_max() -> f64 {
    4.0
}

fn default_source_delay_min() -> f64 {
    3.0
}

fn default_source_delay_max() -> f64 {
    6.0
}

fn default_request_timeout() -> u64 {
    30
}

fn default_export_dir() -> String {
    "news_export".to_string()
}

fn default_list_limit() -> usize {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            pages: default_pages(),
            delay_min_secs: default_delay_min(),
            delay_max_secs: default_delay_max(),
            source_delay_min_secs: default_source_delay_min(),
            source_delay_max_secs: default_source_delay_max(),
            request_timeout_secs: default_request_timeout(),
            upsert_policy: UpsertPolicy::default(),
            export_dir: default_export_dir(),
            list_limit: default_list_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config = Self::from_toml(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.delay_min_secs < 0.0 || self.delay_min_secs > self.delay_max_secs {
            return Err(AppError::Config(format!(
                "delay_min_secs ({}) must be within 0..=delay_max_secs ({})",
                self.delay_min_secs, self.delay_max_secs
            )));
        }
        if self.source_delay_min_secs < 0.0
            || self.source_delay_min_secs > self.source_delay_max_secs
        {
            return Err(AppError::Config(format!(
                "source_delay_min_secs ({}) must be within 0..=source_delay_max_secs ({})",
                self.source_delay_min_secs, self.source_delay_max_secs
            )));
        }
        if self.pages == 0 {
            return Err(AppError::Config("pages must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("football-news")
            .join("config.toml")
    }
}

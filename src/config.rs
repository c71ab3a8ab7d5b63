use crate::common::constants::DEFAULT_PRICING_BASE_URL;
use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `database.path`.
pub const DB_PATH_ENV: &str = "MTG_SCRAPER_DB";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub production: bool,
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub crawl: CrawlConfig,
    pub backfill: BackfillConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub listen: Option<SocketAddr>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub targets: Vec<CrawlTarget>,
}

/// One format's listing to crawl.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlTarget {
    pub url: String,
    pub format: String,
    #[serde(default)]
    pub start_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    pub workers: usize,
    pub pricing_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            production: false,
            database: DatabaseConfig::default(),
            fetcher: FetcherConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            crawl: CrawlConfig::default(),
            backfill: BackfillConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/mtg_analysis.db"),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_000,
            max_delay_ms: 7_000,
            max_retries: 3,
            retry_backoff_ms: 2_000,
            user_agent: concat!("mtg-meta-scraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: "mtgtop8_scraper.log".to_string(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let target = |url: &str, format: &str, start_page| CrawlTarget {
            url: url.to_string(),
            format: format.to_string(),
            start_page,
        };
        Self {
            targets: vec![
                target("https://www.mtgtop8.com/format?f=LE&meta=16", "legacy", 0),
                target("https://www.mtgtop8.com/format?f=ST&meta=58", "standard", 1),
                target("https://www.mtgtop8.com/format?f=PI&meta=191", "pioneer", 1),
            ],
        }
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            pricing_base_url: DEFAULT_PRICING_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        dotenv::dotenv().ok();
        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            if !db_path.trim().is_empty() {
                config.database.path = PathBuf::from(db_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetcher.min_delay_ms > self.fetcher.max_delay_ms {
            return Err(ScraperError::Config(format!(
                "fetcher.min_delay_ms ({}) exceeds fetcher.max_delay_ms ({})",
                self.fetcher.min_delay_ms, self.fetcher.max_delay_ms
            )));
        }
        if self.backfill.workers == 0 {
            return Err(ScraperError::Config(
                "backfill.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Crawl targets restricted to the given formats; `None` keeps all of them.
    pub fn targets_for(&self, formats: Option<&[String]>) -> Vec<CrawlTarget> {
        match formats {
            Some(formats) => self
                .crawl
                .targets
                .iter()
                .filter(|t| formats.iter().any(|f| f.eq_ignore_ascii_case(&t.format)))
                .cloned()
                .collect(),
            None => self.crawl.targets.clone(),
        }
    }
}

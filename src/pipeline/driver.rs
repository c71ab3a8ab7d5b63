use super::crawler::{CrawlReport, Crawler};
use crate::common::error::Result;
use crate::common::types::RunMode;
use crate::config::CrawlTarget;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Serialize)]
pub struct FailedCrawl {
    pub format: String,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DriverReport {
    pub completed: Vec<CrawlReport>,
    pub failed: Vec<FailedCrawl>,
}

/// Runs each format crawl in turn.
///
/// In production a failed crawl is logged and the next target still runs. In
/// development the first failure is returned.
pub async fn run_crawls(
    crawler: &Crawler,
    targets: &[CrawlTarget],
    run_mode: RunMode,
) -> Result<DriverReport> {
    let mut report = DriverReport::default();

    for target in targets {
        info!("Starting {} crawl at page {}", target.format, target.start_page);
        match crawler.crawl(target).await {
            Ok(crawl) => {
                println!(
                    "✅ {}: {} events, {} entries over {} pages",
                    crawl.format,
                    crawl.events,
                    crawl.entries,
                    crawl.pages_visited.len()
                );
                report.completed.push(crawl);
            }
            Err(e) if run_mode.is_production() => {
                error!("Crawl of {} ({}) failed: {}", target.format, target.url, e);
                println!("❌ {}: {}", target.format, e);
                report.failed.push(FailedCrawl {
                    format: target.format.clone(),
                    url: target.url.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

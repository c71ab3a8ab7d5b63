//! Scrape → parse → ingest pipelines: the tournament crawl and the price backfill.

pub mod backfill;
pub mod crawler;
pub mod driver;
pub mod writer;

pub use backfill::{
    backfill_prices, partition, BackfillOptions, BackfillReport, LiveWorkerFactory, WorkerFactory,
    WorkerReport,
};
pub use crawler::{CrawlReport, CrawlState, Crawler};
pub use driver::{run_crawls, DriverReport, FailedCrawl};
pub use writer::{IngestionWriter, ScrapedEntry, ScrapedEvent, WriteStats};

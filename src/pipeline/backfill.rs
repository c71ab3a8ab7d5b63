//! Price history backfill across a fixed pool of workers.
//!
//! The target list is split into contiguous chunks, one per worker. Each worker
//! owns its page source, its store connection and its log file, and walks its
//! chunk sequentially. Workers share nothing; the parent only joins them.

use super::writer::{IngestionWriter, WriteStats};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{InsertMode, PriceTarget};
use crate::config::{BackfillConfig, FetcherConfig};
use crate::fetch::{HttpFetcher, PageSource};
use crate::logging::worker_dispatch;
use crate::metrics;
use crate::parser::{extract_price_points, pricing_url, split_price_series};
use crate::storage::{SqliteStore, TournamentStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, warn};

/// Splits `items` into `workers` contiguous chunks of `ceil(len / workers)`.
///
/// Always returns exactly `workers` chunks; trailing chunks may be short or empty.
pub fn partition<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let chunk_size = items.len().div_ceil(workers).max(1);
    let mut chunks: Vec<Vec<T>> = items.chunks(chunk_size).map(<[T]>::to_vec).collect();
    chunks.resize_with(workers, Vec::new);
    chunks
}

/// Builds the per-worker resources. Each call must hand out an independent instance.
pub trait WorkerFactory: Send + Sync {
    fn page_source(&self, worker: usize) -> Result<Arc<dyn PageSource>>;
    fn store(&self, worker: usize) -> Result<Arc<dyn TournamentStore>>;
}

/// Live factory: one HTTP client and one SQLite connection per worker.
pub struct LiveWorkerFactory {
    pub db_path: PathBuf,
    pub fetcher: FetcherConfig,
}

impl WorkerFactory for LiveWorkerFactory {
    fn page_source(&self, _worker: usize) -> Result<Arc<dyn PageSource>> {
        let fetcher: Arc<dyn PageSource> = Arc::new(HttpFetcher::new(&self.fetcher)?);
        Ok(fetcher)
    }

    fn store(&self, _worker: usize) -> Result<Arc<dyn TournamentStore>> {
        let store: Arc<dyn TournamentStore> = Arc::new(SqliteStore::open(&self.db_path)?);
        Ok(store)
    }
}

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    pub workers: usize,
    pub pricing_base_url: String,
    pub mode: InsertMode,
    /// Directory for `price_worker_<n>.log` files; `None` keeps the global subscriber.
    pub log_dir: Option<PathBuf>,
}

impl BackfillOptions {
    pub fn from_config(config: &BackfillConfig, mode: InsertMode, log_dir: Option<PathBuf>) -> Self {
        Self {
            workers: config.workers,
            pricing_base_url: config.pricing_base_url.clone(),
            mode,
            log_dir,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    pub assigned: usize,
    pub completed: usize,
    pub skipped_points: usize,
    pub rows: WriteStats,
    /// Set when the worker stopped before the end of its chunk.
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct BackfillReport {
    pub workers: Vec<WorkerReport>,
}

impl BackfillReport {
    pub fn completed(&self) -> usize {
        self.workers.iter().map(|w| w.completed).sum()
    }

    pub fn rows(&self) -> WriteStats {
        let mut rows = WriteStats::default();
        for worker in &self.workers {
            rows.merge(worker.rows);
        }
        rows
    }
}

struct Worker {
    id: usize,
    source: Arc<dyn PageSource>,
    writer: IngestionWriter,
    pricing_base_url: String,
    mode: InsertMode,
}

impl Worker {
    async fn backfill_target(&self, target: &PriceTarget, report: &mut WorkerReport) -> Result<()> {
        let url = pricing_url(&self.pricing_base_url, target);
        info!("Worker {} fetching prices for {} ({})", self.id, target.card_name, url);
        let page = self.source.fetch(&url, None).await?;

        let mut points = Vec::new();
        for point in extract_price_points(&page) {
            match point {
                Ok(point) => points.push(point),
                Err(e) => {
                    warn!("Skipping price point for {}: {}", target.card_name, e);
                    metrics::ingest::skipped("price");
                    report.skipped_points += 1;
                }
            }
        }
        if points.is_empty() {
            warn!("No price data found for {} ({})", target.card_name, target.printing_code);
        }

        let series = split_price_series(&points);
        let stats = self.writer.write_prices(target, &series, self.mode)?;
        report.rows.merge(stats);
        Ok(())
    }

    /// Walks the chunk in order, stopping at the first error.
    async fn run(self, chunk: Vec<PriceTarget>) -> (WorkerReport, Option<ScraperError>) {
        let mut report = WorkerReport {
            worker: self.id,
            assigned: chunk.len(),
            ..WorkerReport::default()
        };
        info!("Worker {} starting on {} printings", self.id, chunk.len());

        for target in &chunk {
            if let Err(e) = self.backfill_target(target, &mut report).await {
                error!(
                    "Worker {} stopped at {} ({}) after {} of {}: {}",
                    self.id, target.card_name, target.printing_code, report.completed, report.assigned, e
                );
                report.error = Some(e.to_string());
                return (report, Some(e));
            }
            report.completed += 1;
        }

        info!(
            "Worker {} finished: {} printings, {} prices inserted",
            self.id, report.completed, report.rows.inserted
        );
        (report, None)
    }
}

/// Backfills price history for every target across `options.workers` workers.
///
/// The parent waits for all workers. A failed worker never stops its siblings;
/// in strict mode the first worker error is returned once everyone has joined,
/// in tolerant mode it is only recorded in the report.
pub async fn backfill_prices(
    targets: Vec<PriceTarget>,
    factory: Arc<dyn WorkerFactory>,
    options: &BackfillOptions,
) -> Result<BackfillReport> {
    let chunks = partition(&targets, options.workers);
    info!(
        "Backfilling {} printings across {} workers",
        targets.len(),
        chunks.len()
    );

    // Every worker's resources are built before the first spawn, so a setup
    // failure returns with no worker running.
    let mut prepared = Vec::with_capacity(chunks.len());
    for (id, chunk) in chunks.into_iter().enumerate() {
        let worker = Worker {
            id,
            source: factory.page_source(id)?,
            writer: IngestionWriter::new(factory.store(id)?),
            pricing_base_url: options.pricing_base_url.clone(),
            mode: options.mode,
        };
        let log = match &options.log_dir {
            Some(dir) => Some(worker_dispatch(dir, &format!("price_worker_{id}"))?),
            None => None,
        };
        prepared.push((worker, chunk, log));
    }

    let handles: Vec<_> = prepared
        .into_iter()
        .map(|(worker, chunk, log)| {
            let id = worker.id;
            let handle = match log {
                Some((dispatch, guard)) => tokio::spawn(async move {
                    let _guard = guard;
                    worker.run(chunk).with_subscriber(dispatch).await
                }),
                None => tokio::spawn(worker.run(chunk)),
            };
            (id, handle)
        })
        .collect();

    let mut report = BackfillReport::default();
    let mut first_error = None;
    for (id, handle) in handles {
        let (worker_report, worker_error) = match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let message = join_error.to_string();
                error!("Worker {} panicked: {}", id, message);
                let report = WorkerReport {
                    worker: id,
                    error: Some(message.clone()),
                    ..WorkerReport::default()
                };
                (report, Some(ScraperError::Worker { worker: id, message }))
            }
        };
        if first_error.is_none() {
            first_error = worker_error;
        }
        report.workers.push(worker_report);
    }

    match (options.mode, first_error) {
        (InsertMode::Strict, Some(e)) => Err(e),
        _ => Ok(report),
    }
}

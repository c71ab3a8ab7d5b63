//! Pipeline metrics
//!
//! Counters and histograms are recorded through the `metrics` facade. Without an
//! installed recorder they are no-ops, so library code records unconditionally and
//! only the binary decides whether to export them.

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Install the Prometheus recorder with an HTTP listener. Idempotent.
pub fn init_metrics(listen: SocketAddr) {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(listen)
            .install()
        {
            Ok(()) => {
                info!("Prometheus exporter listening at http://{}/metrics", listen);
                register_all();
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

fn register_all() {
    use ::metrics::{describe_counter, describe_histogram};

    describe_counter!("mtg_pages_fetched_total", "Pages fetched from remote sites");
    describe_counter!("mtg_fetch_retries_total", "Fetch attempts retried after a retryable failure");
    describe_counter!("mtg_fetch_failures_total", "Fetches that failed permanently");
    describe_histogram!("mtg_fetch_duration_seconds", "Wall time of a single HTTP request");
    describe_counter!("mtg_rows_inserted_total", "Rows inserted, by table");
    describe_counter!("mtg_duplicate_inserts_total", "Inserts skipped on a duplicate natural key, by table");
    describe_counter!("mtg_records_skipped_total", "Extracted records skipped on parse failure, by stage");
}

pub mod fetch {
    pub fn page_fetched(site: &'static str, duration_secs: f64) {
        ::metrics::counter!("mtg_pages_fetched_total", "site" => site).increment(1);
        ::metrics::histogram!("mtg_fetch_duration_seconds", "site" => site).record(duration_secs);
    }

    pub fn retried(site: &'static str) {
        ::metrics::counter!("mtg_fetch_retries_total", "site" => site).increment(1);
    }

    pub fn failed(site: &'static str) {
        ::metrics::counter!("mtg_fetch_failures_total", "site" => site).increment(1);
    }
}

pub mod ingest {
    pub fn inserted(table: &'static str) {
        ::metrics::counter!("mtg_rows_inserted_total", "table" => table).increment(1);
    }

    pub fn duplicate(table: &'static str) {
        ::metrics::counter!("mtg_duplicate_inserts_total", "table" => table).increment(1);
    }

    pub fn skipped(stage: &'static str) {
        ::metrics::counter!("mtg_records_skipped_total", "stage" => stage).increment(1);
    }
}

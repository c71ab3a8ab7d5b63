use std::fs;
use std::path::Path;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "mtg_meta_scraper=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped, so `main` has to keep it alive.
pub fn init_logging(dir: &Path, file_name: &str) -> WorkerGuard {
    let _ = fs::create_dir_all(dir);

    let file_appender = tracing_appender::rolling::daily(dir, file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

/// Builds a dispatcher with its own log file for one pipeline instance.
///
/// Backfill workers run their futures under this dispatcher so each worker writes
/// to `<dir>/<name>.log` and never interleaves with its siblings' files.
pub fn worker_dispatch(dir: &Path, name: &str) -> std::io::Result<(Dispatch, WorkerGuard)> {
    fs::create_dir_all(dir)?;
    let file_appender = tracing_appender::rolling::never(dir, format!("{name}.log"));
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(non_blocking_writer),
        )
        .with(fmt::layer().with_writer(std::io::stdout));

    Ok((Dispatch::new(subscriber), guard))
}

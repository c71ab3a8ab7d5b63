use clap::{Parser, Subcommand};
use mtg_meta_scraper::common::types::{PriceTarget, RunMode};
use mtg_meta_scraper::config::Config;
use mtg_meta_scraper::fetch::{HttpFetcher, PageSource};
use mtg_meta_scraper::pipeline::{
    backfill_prices, run_crawls, BackfillOptions, Crawler, IngestionWriter, LiveWorkerFactory,
    WorkerFactory,
};
use mtg_meta_scraper::storage::{SqliteStore, TournamentStore};
use mtg_meta_scraper::{logging, metrics, Result, ScraperError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "mtg_meta_scraper")]
#[command(about = "Magic: the Gathering tournament and price scraper")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb,
    /// Crawl tournament listings and ingest events, decklists and cards
    Crawl {
        /// Formats to crawl (comma-separated). Defaults to every configured target
        #[arg(long, value_delimiter = ',')]
        formats: Option<Vec<String>>,
        /// Override the listing page each target starts from
        #[arg(long)]
        start_page: Option<u32>,
        /// Strict inserts, and keep going past a failed format
        #[arg(long)]
        production: bool,
    },
    /// Backfill price history for the printings listed in a JSON file
    Backfill {
        /// JSON array of {card_name, printing_code, printing_name, foil}
        #[arg(long)]
        targets: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        production: bool,
    },
    /// Report suspicious decklists and row counts
    Audit,
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.database.path)?;
    store.run_migrations()?;
    Ok(Arc::new(store))
}

fn run_mode(config: &Config, production_flag: bool) -> RunMode {
    RunMode::from_production_flag(production_flag || config.production)
}

async fn crawl(
    config: &Config,
    formats: Option<Vec<String>>,
    start_page: Option<u32>,
    production: bool,
) -> Result<()> {
    let mode = run_mode(config, production);
    let mut targets = config.targets_for(formats.as_deref());
    if targets.is_empty() {
        return Err(ScraperError::Config(format!(
            "No crawl targets match {:?}",
            formats.unwrap_or_default()
        )));
    }
    if let Some(page) = start_page {
        for target in &mut targets {
            target.start_page = page;
        }
    }

    println!("🔄 Crawling {} format(s) in {:?} mode...", targets.len(), mode);
    let store: Arc<dyn TournamentStore> = open_store(config)?;
    let source: Arc<dyn PageSource> = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let crawler = Crawler::new(source, IngestionWriter::new(store), mode.insert_mode());

    let report = run_crawls(&crawler, &targets, mode).await?;
    if !report.failed.is_empty() {
        warn!("{} crawl(s) failed", report.failed.len());
        println!("\n⚠️  Failed crawls:");
        for failed in &report.failed {
            println!("   - {} ({}): {}", failed.format, failed.url, failed.error);
        }
    }
    Ok(())
}

async fn backfill(
    config: &Config,
    targets_path: PathBuf,
    workers: Option<usize>,
    production: bool,
) -> Result<()> {
    let mode = run_mode(config, production);
    let content = std::fs::read_to_string(&targets_path)?;
    let targets: Vec<PriceTarget> = serde_json::from_str(&content)?;

    // Create the schema once before workers open their own connections.
    open_store(config)?;

    let mut options = BackfillOptions::from_config(
        &config.backfill,
        mode.insert_mode(),
        Some(config.logging.dir.clone()),
    );
    if let Some(workers) = workers {
        options.workers = workers.max(1);
    }
    let factory: Arc<dyn WorkerFactory> = Arc::new(LiveWorkerFactory {
        db_path: config.database.path.clone(),
        fetcher: config.fetcher.clone(),
    });

    println!(
        "💰 Backfilling {} printings with {} workers...",
        targets.len(),
        options.workers
    );
    let report = backfill_prices(targets, factory, &options).await?;

    let rows = report.rows();
    println!("\n📊 Backfill Results:");
    println!("   Printings completed: {}", report.completed());
    println!("   Prices inserted: {}", rows.inserted);
    println!("   Duplicates skipped: {}", rows.duplicates);
    for worker in report.workers.iter().filter(|w| w.error.is_some()) {
        println!(
            "   ⚠️  Worker {} stopped after {}/{}: {}",
            worker.worker,
            worker.completed,
            worker.assigned,
            worker.error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

fn audit(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let report = store.audit()?;

    println!("\n📊 Database contents:");
    println!("   Tournaments: {}", report.counts.tournaments);
    println!("   Entries: {}", report.counts.entries);
    println!("   Card lines: {}", report.counts.cards);
    println!("   Prices: {}", report.counts.prices);

    if report.is_clean() {
        println!("\n✅ No data quality issues found");
        return Ok(());
    }
    println!("\n⚠️  Data quality issues:");
    for deck in &report.oversized_mainboards {
        println!("   - mainboard of {} cards: {}", deck.count, deck.url);
    }
    for deck in &report.oversized_sideboards {
        println!("   - sideboard of {} cards: {}", deck.count, deck.url);
    }
    for line in &report.excess_copies {
        println!("   - {} copies of {}: {}", line.quantity, line.card, line.url);
    }
    for url in &report.unknown_card_decks {
        println!("   - unknown card in {}", url);
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::InitDb => {
            open_store(&config)?;
            println!("✅ Database ready at {}", config.database.path.display());
            Ok(())
        }
        Commands::Crawl {
            formats,
            start_page,
            production,
        } => crawl(&config, formats, start_page, production).await,
        Commands::Backfill {
            targets,
            workers,
            production,
        } => backfill(&config, targets, workers, production).await,
        Commands::Audit => audit(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let _guard = logging::init_logging(&config.logging.dir, &config.logging.file);
    if let Some(listen) = config.metrics.listen {
        metrics::init_metrics(listen);
    }
    info!("Using database {}", config.database.path.display());

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {}", e);
            println!("❌ {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

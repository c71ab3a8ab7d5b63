mod common;

use anyhow::Result;
use common::{deck_page, deck_url, event_page, event_url, listing_page, FixtureSource, LEGACY_URL};
use mtg_meta_scraper::common::types::{EntryKey, InsertMode, RunMode, TournamentKey};
use mtg_meta_scraper::config::CrawlTarget;
use mtg_meta_scraper::pipeline::{run_crawls, Crawler, IngestionWriter};
use mtg_meta_scraper::storage::{SqliteStore, TournamentStore};
use mtg_meta_scraper::{ScraperError, StoreError};
use std::sync::Arc;

const VINTAGE_URL: &str = "https://www.mtgtop8.com/format?f=VI&meta=3";

fn legacy_target(start_page: u32) -> CrawlTarget {
    CrawlTarget {
        url: LEGACY_URL.to_string(),
        format: "legacy".to_string(),
        start_page,
    }
}

/// Three listing pages: two with events, the third with only sidebar rows.
fn legacy_site() -> FixtureSource {
    FixtureSource::new()
        .listing(
            LEGACY_URL,
            1,
            listing_page(&[(101, "Legacy Challenge", "04/07/19"), (102, "Legacy League", "05/07/19")]),
        )
        .listing(LEGACY_URL, 2, listing_page(&[(103, "Legacy Preliminary", "28/06/19")]))
        .listing(LEGACY_URL, 3, listing_page(&[]))
        .page(
            &event_url(101),
            event_page(101, 64, &[(1, "1", "Delver", "Alice"), (2, "2", "Sneak and Show", "Bob")]),
        )
        .page(&event_url(102), event_page(102, 5, &[(3, "3-4", "Lands", "Carol")]))
        .page(&event_url(103), event_page(103, 32, &[(4, "Top 8", "Goodstuff", "Dave")]))
        .page(
            &deck_url(101, 1),
            deck_page(
                Some("Delver decks"),
                &[("4", "Brainstorm"), ("4", "Delver of Secrets"), ("4", "Daze")],
                &[("2", "Pyroblast")],
            ),
        )
        .page(
            &deck_url(101, 2),
            deck_page(Some("Sneak and Show"), &[("4", "Show and Tell"), ("x", "Misprint")], &[]),
        )
        .page(&deck_url(102, 3), deck_page(Some("Lands decks"), &[("4", "Mox Diamond")], &[]))
        .page(&deck_url(103, 4), deck_page(None, &[("4", "Thoughtseize")], &[("1", "Force of Will")]))
}

fn memory_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    store.run_migrations().unwrap();
    Arc::new(store)
}

fn crawler(source: Arc<FixtureSource>, store: Arc<SqliteStore>, mode: InsertMode) -> Crawler {
    Crawler::new(source, IngestionWriter::new(store), mode)
}

#[tokio::test]
async fn test_crawl_stops_at_first_empty_page() -> Result<()> {
    let source = Arc::new(legacy_site());
    let store = memory_store();
    let crawler = crawler(source.clone(), store.clone(), InsertMode::Tolerant);

    let report = crawler.crawl(&legacy_target(1)).await?;

    assert_eq!(report.pages_visited, vec![1, 2, 3]);
    assert_eq!(report.events, 3);
    assert_eq!(report.entries, 4);
    let listing_requests = source
        .requests()
        .into_iter()
        .filter(|r| r.starts_with(LEGACY_URL))
        .count();
    assert_eq!(listing_requests, 3);

    let counts = store.row_counts()?;
    assert_eq!(counts.tournaments, 3);
    assert_eq!(counts.entries, 4);
    assert_eq!(counts.cards, 8);
    Ok(())
}

#[tokio::test]
async fn test_crawl_persists_resolved_fields() -> Result<()> {
    let store = memory_store();
    let crawler = crawler(Arc::new(legacy_site()), store.clone(), InsertMode::Tolerant);

    let report = crawler.crawl(&legacy_target(1)).await?;
    // The misprinted card line is skipped; the rest of that deck is kept.
    assert_eq!(report.skipped_records, 1);

    let tournament_id = store.tournament_info_id(&TournamentKey {
        name: "Legacy Challenge".to_string(),
        date: "07/04/2019".to_string(),
        format: "legacy".to_string(),
        url: event_url(101),
    })?;
    assert_eq!(store.tournament_size(tournament_id)?, Some(64));

    let key = |archetype: &str, placement: &str, player: &str| EntryKey {
        tournament_id,
        archetype: archetype.to_string(),
        placement: placement.to_string(),
        player: player.to_string(),
    };
    assert!(store.tournament_entry_id(&key("Delver", "1", "Alice")).is_ok());
    assert!(store.tournament_entry_id(&key("Sneak and Show", "2", "Bob")).is_ok());

    let prelim_id = store.tournament_info_id(&TournamentKey {
        name: "Legacy Preliminary".to_string(),
        date: "06/28/2019".to_string(),
        format: "legacy".to_string(),
        url: event_url(103),
    })?;
    let goodstuff = EntryKey {
        tournament_id: prelim_id,
        archetype: "bu".to_string(),
        placement: "Top 8".to_string(),
        player: "Dave".to_string(),
    };
    assert!(store.tournament_entry_id(&goodstuff).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_tolerant_recrawl_adds_no_rows() -> Result<()> {
    let store = memory_store();
    let crawler = crawler(Arc::new(legacy_site()), store.clone(), InsertMode::Tolerant);

    crawler.crawl(&legacy_target(1)).await?;
    let before = store.row_counts()?;
    let second = crawler.crawl(&legacy_target(1)).await?;

    assert_eq!(second.rows.inserted, 0);
    assert_eq!(second.rows.duplicates, 3 + 4 + 8);
    assert_eq!(store.row_counts()?, before);
    Ok(())
}

#[tokio::test]
async fn test_strict_recrawl_aborts_on_duplicate() -> Result<()> {
    let store = memory_store();
    let crawler = crawler(Arc::new(legacy_site()), store.clone(), InsertMode::Strict);

    crawler.crawl(&legacy_target(1)).await?;
    let err = crawler.crawl(&legacy_target(1)).await.unwrap_err();

    assert!(matches!(
        err,
        ScraperError::Store(StoreError::UniqueViolation { table: "tournament_info", .. })
    ));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(store.row_counts()?.tournaments, 3);
    Ok(())
}

#[tokio::test]
async fn test_start_page_past_the_end_visits_one_page() -> Result<()> {
    let store = memory_store();
    let crawler = crawler(Arc::new(legacy_site()), store.clone(), InsertMode::Tolerant);

    let report = crawler.crawl(&legacy_target(3)).await?;

    assert_eq!(report.pages_visited, vec![3]);
    assert_eq!(store.row_counts()?.tournaments, 0);
    Ok(())
}

fn broken_then_legacy() -> Vec<CrawlTarget> {
    vec![
        CrawlTarget {
            url: VINTAGE_URL.to_string(),
            format: "vintage".to_string(),
            start_page: 1,
        },
        legacy_target(1),
    ]
}

#[tokio::test]
async fn test_production_driver_continues_past_failed_crawl() -> Result<()> {
    let store = memory_store();
    let crawler = crawler(Arc::new(legacy_site()), store.clone(), InsertMode::Strict);

    let report = run_crawls(&crawler, &broken_then_legacy(), RunMode::Production).await?;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].format, "vintage");
    assert_eq!(report.completed.len(), 1);
    assert_eq!(store.row_counts()?.tournaments, 3);
    Ok(())
}

#[tokio::test]
async fn test_development_driver_propagates_failure() -> Result<()> {
    let store = memory_store();
    let crawler = crawler(Arc::new(legacy_site()), store.clone(), InsertMode::Tolerant);

    let err = run_crawls(&crawler, &broken_then_legacy(), RunMode::Development)
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::Fetch { status: 404, .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(store.row_counts()?.tournaments, 0);
    Ok(())
}

//! Crawl controller for one format's tournament listing.
//!
//! Listing pages are requested by page number until a page yields no event rows.
//! Every event is fetched in full (event page plus each decklist) before it is
//! written, so a unit of work never waits on the network.

use super::writer::{IngestionWriter, ScrapedEntry, ScrapedEvent, WriteStats};
use crate::common::constants::{MIN_EVENTS_PER_PAGE, PAGE_FORM_FIELD};
use crate::common::error::{ParseError, Result};
use crate::common::types::{InsertMode, TournamentInfo};
use crate::config::CrawlTarget;
use crate::fetch::{FormData, PageSource};
use crate::metrics;
use crate::parser::{extract_event, extract_listing, read_deck_page, EventCandidate};
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum CrawlState {
    FetchingPage(u32),
    ParsingPage { page: u32, html: String },
    Done,
}

/// Result of one format crawl.
#[derive(Debug, Default, Serialize)]
pub struct CrawlReport {
    pub format: String,
    pub pages_visited: Vec<u32>,
    pub events: usize,
    pub entries: usize,
    pub skipped_records: usize,
    pub rows: WriteStats,
}

pub struct Crawler {
    source: Arc<dyn PageSource>,
    writer: IngestionWriter,
    mode: InsertMode,
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| {
        ParseError::BadUrl {
            input: url.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn log_skipped(stage: &'static str, context: &str, errors: &[ParseError]) -> usize {
    for e in errors {
        warn!("Skipping {} record in {}: {}", stage, context, e);
        metrics::ingest::skipped(stage);
    }
    errors.len()
}

impl Crawler {
    pub fn new(source: Arc<dyn PageSource>, writer: IngestionWriter, mode: InsertMode) -> Self {
        Self {
            source,
            writer,
            mode,
        }
    }

    /// Crawls `target` from its start page until a listing page comes back empty.
    #[instrument(skip(self, target), fields(format = %target.format))]
    pub async fn crawl(&self, target: &CrawlTarget) -> Result<CrawlReport> {
        let base = parse_base(&target.url)?;
        let mut report = CrawlReport {
            format: target.format.clone(),
            ..CrawlReport::default()
        };

        let mut state = CrawlState::FetchingPage(target.start_page);
        loop {
            state = match state {
                CrawlState::FetchingPage(page) => {
                    info!("Fetching {} listing page {}", target.format, page);
                    let form: FormData = vec![(PAGE_FORM_FIELD.to_string(), page.to_string())];
                    let html = self.source.fetch(&target.url, Some(&form)).await?;
                    report.pages_visited.push(page);
                    CrawlState::ParsingPage { page, html }
                }
                CrawlState::ParsingPage { page, html } => {
                    let listing = extract_listing(&html, &base);
                    let context = format!("{} page {}", target.format, page);
                    report.skipped_records += log_skipped("listing", &context, &listing.rejected);
                    for url in &listing.denied {
                        info!("Ignoring known malformed event {}", url);
                    }

                    if listing.is_final() {
                        info!("No events on {}, crawl finished", context);
                        CrawlState::Done
                    } else {
                        if listing.matched_rows < MIN_EVENTS_PER_PAGE {
                            warn!(
                                "Only {} events on {}, expected at least {}",
                                listing.matched_rows, context, MIN_EVENTS_PER_PAGE
                            );
                        }
                        for candidate in &listing.events {
                            self.process_event(candidate, &target.format, &mut report)
                                .await?;
                        }
                        CrawlState::FetchingPage(page + 1)
                    }
                }
                CrawlState::Done => break,
            };
        }

        info!(
            "Crawl of {} done: {} pages, {} events, {} entries, {} rows inserted, {} duplicates",
            report.format,
            report.pages_visited.len(),
            report.events,
            report.entries,
            report.rows.inserted,
            report.rows.duplicates
        );
        Ok(report)
    }

    async fn process_event(
        &self,
        candidate: &EventCandidate,
        format: &str,
        report: &mut CrawlReport,
    ) -> Result<()> {
        info!("Fetching event {} ({})", candidate.name, candidate.url);
        let html = self.source.fetch(&candidate.url, None).await?;
        let event_page = extract_event(&html, &parse_base(&candidate.url)?);
        report.skipped_records += log_skipped("entry", &candidate.url, &event_page.rejected);

        let mut entries = Vec::with_capacity(event_page.entries.len());
        for summary in event_page.entries {
            info!("Fetching entry {} by {} ({})", summary.deck_name, summary.player, summary.url);
            let html = self.source.fetch(&summary.url, None).await?;
            let deck = read_deck_page(&html, &summary.deck_name);
            report.skipped_records += log_skipped("card", &summary.url, &deck.rejected);
            for card in &deck.cards {
                info!("Fetching card {} from {}", card.name, summary.url);
            }
            entries.push(ScrapedEntry {
                placement: summary.rank,
                player: summary.player,
                deck_name: summary.deck_name,
                archetype: deck.archetype,
                url: summary.url,
                cards: deck.cards,
            });
        }

        let event = ScrapedEvent {
            info: TournamentInfo {
                name: candidate.name.clone(),
                date: candidate.date.clone(),
                format: format.to_string(),
                size: event_page.size,
                url: candidate.url.clone(),
            },
            entries,
        };
        let stats = self.writer.write_event(&event, self.mode)?;
        report.events += 1;
        report.entries += event.entries.len();
        report.rows.merge(stats);
        Ok(())
    }
}

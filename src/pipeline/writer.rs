//! Ingestion writer: persists scraped tournaments, decklists and prices.
//!
//! The insert mode is passed on every call. In strict mode a repeated natural key
//! aborts the enclosing unit; in tolerant mode it is logged with its key and skipped.
//! Any other database error propagates in both modes.

use crate::common::error::{StoreError, StoreResult};
use crate::common::types::{
    CardPrice, EntryCard, InsertMode, PriceTarget, TournamentEntry, TournamentInfo,
};
use crate::metrics;
use crate::parser::{CardLine, PriceSeries};
use crate::storage::{
    InsertOutcome, OnConflict, TournamentStore, CARD_PRICE_TABLE, ENTRY_CARD_TABLE,
    TOURNAMENT_ENTRY_TABLE, TOURNAMENT_INFO_TABLE,
};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// One decklist, fetched and parsed, ready to be written under its event.
#[derive(Debug, Clone)]
pub struct ScrapedEntry {
    pub placement: String,
    pub player: String,
    pub deck_name: String,
    pub archetype: String,
    pub url: String,
    pub cards: Vec<CardLine>,
}

/// An event with all of its decklists.
#[derive(Debug, Clone)]
pub struct ScrapedEvent {
    pub info: TournamentInfo,
    pub entries: Vec<ScrapedEntry>,
}

/// Insert counts for one write call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    pub inserted: usize,
    pub duplicates: usize,
}

impl WriteStats {
    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Duplicate => self.duplicates += 1,
        }
    }

    pub fn merge(&mut self, other: WriteStats) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

#[derive(Clone)]
pub struct IngestionWriter {
    store: Arc<dyn TournamentStore>,
}

/// Logs and counts the outcome of one insert.
fn observe(
    table: &'static str,
    key: impl Display,
    result: StoreResult<InsertOutcome>,
) -> StoreResult<InsertOutcome> {
    match &result {
        Ok(InsertOutcome::Inserted) => {
            debug!("Inserted {} row ({})", table, key);
            metrics::ingest::inserted(table);
        }
        Ok(InsertOutcome::Duplicate) => {
            warn!("Duplicate {} row skipped ({})", table, key);
            metrics::ingest::duplicate(table);
        }
        Err(e) => error!("Insert into {} failed ({}): {}", table, key, e),
    }
    result
}

impl IngestionWriter {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TournamentStore> {
        &self.store
    }

    pub fn insert_tournament_info(
        &self,
        info: &TournamentInfo,
        mode: InsertMode,
    ) -> StoreResult<InsertOutcome> {
        observe(
            TOURNAMENT_INFO_TABLE,
            info.key(),
            self.store.insert_tournament_info(info, OnConflict::from(mode)),
        )
    }

    pub fn insert_tournament_entry(
        &self,
        entry: &TournamentEntry,
        mode: InsertMode,
    ) -> StoreResult<InsertOutcome> {
        observe(
            TOURNAMENT_ENTRY_TABLE,
            entry.key(),
            self.store.insert_tournament_entry(entry, OnConflict::from(mode)),
        )
    }

    pub fn insert_entry_card(&self, card: &EntryCard, mode: InsertMode) -> StoreResult<InsertOutcome> {
        observe(
            ENTRY_CARD_TABLE,
            card,
            self.store.insert_entry_card(card, OnConflict::from(mode)),
        )
    }

    pub fn insert_card_price(&self, price: &CardPrice, mode: InsertMode) -> StoreResult<InsertOutcome> {
        observe(
            CARD_PRICE_TABLE,
            price,
            self.store.insert_card_price(price, OnConflict::from(mode)),
        )
    }

    /// Runs `work` as one unit: committed when it succeeds, rolled back otherwise.
    fn in_unit<T>(&self, work: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        self.store.begin_unit()?;
        match work() {
            Ok(value) => match self.store.commit_unit() {
                Ok(()) => Ok(value),
                Err(e) => Err(self.abandon_unit(e)),
            },
            Err(e) => Err(self.abandon_unit(e)),
        }
    }

    /// Rolls back the open unit after `e`, so the store can begin the next one.
    fn abandon_unit(&self, e: StoreError) -> StoreError {
        if let Err(rollback) = self.store.rollback_unit() {
            error!("Rollback failed after {}: {}", e, rollback);
        }
        e
    }

    /// Writes an event, its entries and their cards as a single unit.
    ///
    /// Each parent id is looked up by natural key after its insert, inside the
    /// same unit, so a duplicate parent still resolves to the existing row.
    pub fn write_event(&self, event: &ScrapedEvent, mode: InsertMode) -> StoreResult<WriteStats> {
        self.in_unit(|| {
            let mut stats = WriteStats::default();

            stats.record(self.insert_tournament_info(&event.info, mode)?);
            let tournament_id = self.store.tournament_info_id(&event.info.key())?;
            if let Some(size) = event.info.size {
                self.store.update_tournament_size(tournament_id, size)?;
            }

            for scraped in &event.entries {
                let entry = TournamentEntry {
                    tournament_id,
                    archetype: scraped.archetype.clone(),
                    placement: scraped.placement.clone(),
                    player: scraped.player.clone(),
                    deck_name: scraped.deck_name.clone(),
                    url: scraped.url.clone(),
                };
                stats.record(self.insert_tournament_entry(&entry, mode)?);
                let entry_id = self.store.tournament_entry_id(&entry.key())?;

                for line in &scraped.cards {
                    let card = EntryCard {
                        entry_id,
                        card_name: line.name.clone(),
                        is_mainboard: line.is_mainboard,
                        quantity: line.quantity,
                    };
                    stats.record(self.insert_entry_card(&card, mode)?);
                }
            }

            Ok(stats)
        })
    }

    /// Writes both price series of one printing as a single unit.
    pub fn write_prices(
        &self,
        target: &PriceTarget,
        series: &PriceSeries,
        mode: InsertMode,
    ) -> StoreResult<WriteStats> {
        let rows = series
            .paper
            .iter()
            .map(|point| (point, true))
            .chain(series.online.iter().map(|point| (point, false)));

        self.in_unit(|| {
            let mut stats = WriteStats::default();
            for (point, is_paper) in rows {
                let price = CardPrice {
                    card_name: target.card_name.clone(),
                    printing_code: target.printing_code.clone(),
                    date: point.date,
                    price: point.price,
                    is_paper,
                };
                stats.record(self.insert_card_price(&price, mode)?);
            }
            Ok(stats)
        })
    }
}

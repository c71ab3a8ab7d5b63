//! Persistence for tournaments, decklists and prices.
//!
//! Every insert takes an explicit [`OnConflict`] so the caller decides whether a
//! natural-key collision is an error or a no-op. Generated ids are not returned
//! by inserts; callers look them up by natural key inside the same unit of work.

pub mod audit;
pub mod sqlite;

pub use audit::AuditReport;
pub use sqlite::SqliteStore;

use crate::common::error::StoreResult;
use crate::common::types::{
    CardPrice, EntryCard, EntryKey, InsertMode, TournamentEntry, TournamentInfo, TournamentKey,
};

pub const TOURNAMENT_INFO_TABLE: &str = "tournament_info";
pub const TOURNAMENT_ENTRY_TABLE: &str = "tournament_entry";
pub const ENTRY_CARD_TABLE: &str = "entry_card";
pub const CARD_PRICE_TABLE: &str = "card_price";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Report the collision as [`crate::common::error::StoreError::UniqueViolation`].
    Fail,
    /// Leave the existing row in place and report [`InsertOutcome::Duplicate`].
    Ignore,
}

impl From<InsertMode> for OnConflict {
    fn from(mode: InsertMode) -> Self {
        match mode {
            InsertMode::Strict => OnConflict::Fail,
            InsertMode::Tolerant => OnConflict::Ignore,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub tournaments: u64,
    pub entries: u64,
    pub cards: u64,
    pub prices: u64,
}

/// Storage operations used by the ingestion pipeline.
///
/// A store serves a single pipeline instance. `begin_unit`/`commit_unit` bracket
/// one logical unit (an event with its entries and cards, or one printing's
/// prices) so insert-then-lookup sequences are atomic.
pub trait TournamentStore: Send + Sync {
    fn begin_unit(&self) -> StoreResult<()>;
    fn commit_unit(&self) -> StoreResult<()>;
    fn rollback_unit(&self) -> StoreResult<()>;

    fn insert_tournament_info(
        &self,
        info: &TournamentInfo,
        on_conflict: OnConflict,
    ) -> StoreResult<InsertOutcome>;
    fn tournament_info_id(&self, key: &TournamentKey) -> StoreResult<i64>;
    fn update_tournament_size(&self, tournament_id: i64, size: u32) -> StoreResult<()>;

    fn insert_tournament_entry(
        &self,
        entry: &TournamentEntry,
        on_conflict: OnConflict,
    ) -> StoreResult<InsertOutcome>;
    fn tournament_entry_id(&self, key: &EntryKey) -> StoreResult<i64>;

    fn insert_entry_card(&self, card: &EntryCard, on_conflict: OnConflict)
        -> StoreResult<InsertOutcome>;

    fn insert_card_price(&self, price: &CardPrice, on_conflict: OnConflict)
        -> StoreResult<InsertOutcome>;

    fn row_counts(&self) -> StoreResult<RowCounts>;
}

use super::{
    InsertOutcome, OnConflict, RowCounts, TournamentStore, CARD_PRICE_TABLE, ENTRY_CARD_TABLE,
    TOURNAMENT_ENTRY_TABLE, TOURNAMENT_INFO_TABLE,
};
use crate::common::error::{StoreError, StoreResult};
use crate::common::types::{
    CardPrice, EntryCard, EntryKey, TournamentEntry, TournamentInfo, TournamentKey,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const MIGRATIONS: &str = include_str!("../../migrations/001_create_tournament_tables.sql");

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == ErrorCode::ConstraintViolation
                && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Runs an insert. `Ignore` uses `ON CONFLICT DO NOTHING`, which only covers
/// uniqueness conflicts: NOT NULL, CHECK and foreign-key failures still surface.
fn insert_row(
    conn: &Connection,
    table: &'static str,
    columns: &[&str],
    values: &[&dyn ToSql],
    on_conflict: OnConflict,
    key: impl FnOnce() -> String,
) -> StoreResult<InsertOutcome> {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    if on_conflict == OnConflict::Ignore {
        sql.push_str(" ON CONFLICT DO NOTHING");
    }

    match conn.prepare_cached(&sql)?.execute(values) {
        Ok(0) => Ok(InsertOutcome::Duplicate),
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => Err(StoreError::UniqueViolation { table, key: key() }),
        Err(e) => Err(e.into()),
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::configure(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(30))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the schema. Safe to run against an existing database.
    pub fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations...");
        self.conn()?.execute_batch(MIGRATIONS)?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    pub(crate) fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Current size of a tournament, for inspection and tests.
    pub fn tournament_size(&self, tournament_id: i64) -> StoreResult<Option<u32>> {
        let size = self
            .conn()?
            .query_row(
                "SELECT size FROM tournament_info WHERE tournament_id = ?1",
                params![tournament_id],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()?;
        size.ok_or_else(|| StoreError::MissingRow {
            table: TOURNAMENT_INFO_TABLE,
            key: tournament_id.to_string(),
        })
    }
}

impl TournamentStore for SqliteStore {
    fn begin_unit(&self) -> StoreResult<()> {
        self.conn()?.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit_unit(&self) -> StoreResult<()> {
        self.conn()?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback_unit(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn insert_tournament_info(
        &self,
        info: &TournamentInfo,
        on_conflict: OnConflict,
    ) -> StoreResult<InsertOutcome> {
        insert_row(
            &*self.conn()?,
            TOURNAMENT_INFO_TABLE,
            &["name", "date", "format", "size", "url"],
            &[&info.name, &info.date, &info.format, &info.size, &info.url],
            on_conflict,
            || info.key().to_string(),
        )
    }

    fn tournament_info_id(&self, key: &TournamentKey) -> StoreResult<i64> {
        self.conn()?
            .query_row(
                "SELECT tournament_id FROM tournament_info
                 WHERE name = ?1 AND date = ?2 AND format = ?3 AND url = ?4",
                params![key.name, key.date, key.format, key.url],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::MissingRow {
                table: TOURNAMENT_INFO_TABLE,
                key: key.to_string(),
            })
    }

    fn update_tournament_size(&self, tournament_id: i64, size: u32) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE tournament_info SET size = ?1 WHERE tournament_id = ?2",
            params![size, tournament_id],
        )?;
        Ok(())
    }

    fn insert_tournament_entry(
        &self,
        entry: &TournamentEntry,
        on_conflict: OnConflict,
    ) -> StoreResult<InsertOutcome> {
        insert_row(
            &*self.conn()?,
            TOURNAMENT_ENTRY_TABLE,
            &["tournament_id", "archetype", "placement", "player", "deck_name", "url"],
            &[
                &entry.tournament_id,
                &entry.archetype,
                &entry.placement,
                &entry.player,
                &entry.deck_name,
                &entry.url,
            ],
            on_conflict,
            || entry.key().to_string(),
        )
    }

    fn tournament_entry_id(&self, key: &EntryKey) -> StoreResult<i64> {
        self.conn()?
            .query_row(
                "SELECT entry_id FROM tournament_entry
                 WHERE tournament_id = ?1 AND archetype = ?2 AND placement = ?3 AND player = ?4",
                params![key.tournament_id, key.archetype, key.placement, key.player],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::MissingRow {
                table: TOURNAMENT_ENTRY_TABLE,
                key: key.to_string(),
            })
    }

    fn insert_entry_card(
        &self,
        card: &EntryCard,
        on_conflict: OnConflict,
    ) -> StoreResult<InsertOutcome> {
        insert_row(
            &*self.conn()?,
            ENTRY_CARD_TABLE,
            &["entry_id", "card", "mainboard", "quantity"],
            &[&card.entry_id, &card.card_name, &card.is_mainboard, &card.quantity],
            on_conflict,
            || card.to_string(),
        )
    }

    fn insert_card_price(
        &self,
        price: &CardPrice,
        on_conflict: OnConflict,
    ) -> StoreResult<InsertOutcome> {
        let date = price.date.format("%Y-%m-%d").to_string();
        insert_row(
            &*self.conn()?,
            CARD_PRICE_TABLE,
            &["card", "printing", "date", "price", "is_paper"],
            &[&price.card_name, &price.printing_code, &date, &price.price, &price.is_paper],
            on_conflict,
            || price.to_string(),
        )
    }

    fn row_counts(&self) -> StoreResult<RowCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> StoreResult<u64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        };
        Ok(RowCounts {
            tournaments: count(TOURNAMENT_INFO_TABLE)?,
            entries: count(TOURNAMENT_ENTRY_TABLE)?,
            cards: count(ENTRY_CARD_TABLE)?,
            prices: count(CARD_PRICE_TABLE)?,
        })
    }
}

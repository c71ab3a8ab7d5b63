//! Data-quality checks over ingested decklists.
//!
//! Each finding points at the deck url so it can be re-checked by hand on the site.

use super::{RowCounts, SqliteStore, TournamentStore};
use crate::common::error::StoreResult;
use rusqlite::params;
use serde::Serialize;

pub const MAX_MAINBOARD: u32 = 60;
pub const MAX_SIDEBOARD: u32 = 15;
pub const MAX_COPIES: u32 = 4;
pub const UNKNOWN_CARD: &str = "Unknown Card";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckFinding {
    pub url: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardFinding {
    pub url: String,
    pub card: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub oversized_mainboards: Vec<DeckFinding>,
    pub oversized_sideboards: Vec<DeckFinding>,
    pub excess_copies: Vec<CardFinding>,
    pub unknown_card_decks: Vec<String>,
    #[serde(skip)]
    pub counts: RowCounts,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.oversized_mainboards.is_empty()
            && self.oversized_sideboards.is_empty()
            && self.excess_copies.is_empty()
            && self.unknown_card_decks.is_empty()
    }
}

impl SqliteStore {
    pub fn audit(&self) -> StoreResult<AuditReport> {
        let counts = self.row_counts()?;
        let conn = self.conn()?;

        let board_totals = |mainboard: bool, limit: u32| -> StoreResult<Vec<DeckFinding>> {
            let mut stmt = conn.prepare(
                "SELECT e.url, SUM(c.quantity) AS total
                 FROM tournament_entry e JOIN entry_card c ON c.entry_id = e.entry_id
                 WHERE c.mainboard = ?1
                 GROUP BY e.entry_id HAVING total > ?2
                 ORDER BY total DESC, e.url",
            )?;
            let rows = stmt.query_map(params![mainboard, limit], |row| {
                Ok(DeckFinding {
                    url: row.get(0)?,
                    count: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        };
        let oversized_mainboards = board_totals(true, MAX_MAINBOARD)?;
        let oversized_sideboards = board_totals(false, MAX_SIDEBOARD)?;

        let mut stmt = conn.prepare(
            "SELECT e.url, c.card, c.quantity
             FROM tournament_entry e JOIN entry_card c ON c.entry_id = e.entry_id
             WHERE c.quantity > ?1
             ORDER BY e.url, c.quantity DESC",
        )?;
        let excess_copies = stmt
            .query_map(params![MAX_COPIES], |row| {
                Ok(CardFinding {
                    url: row.get(0)?,
                    card: row.get(1)?,
                    quantity: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT e.url
             FROM tournament_entry e JOIN entry_card c ON c.entry_id = e.entry_id
             WHERE c.card = ?1
             ORDER BY e.url",
        )?;
        let unknown_card_decks = stmt
            .query_map(params![UNKNOWN_CARD], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(AuditReport {
            oversized_mainboards,
            oversized_sideboards,
            excess_copies,
            unknown_card_decks,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{EntryCard, TournamentEntry, TournamentInfo};
    use crate::storage::OnConflict;

    fn seeded(cards: &[(&str, bool, u32)]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.run_migrations().unwrap();
        let info = TournamentInfo {
            name: "Modern Challenge".to_string(),
            date: "06/10/2019".to_string(),
            format: "modern".to_string(),
            size: Some(32),
            url: "https://www.mtgtop8.com/event?e=5&f=MO".to_string(),
        };
        store.insert_tournament_info(&info, OnConflict::Fail).unwrap();
        let tournament_id = store.tournament_info_id(&info.key()).unwrap();
        let entry = TournamentEntry {
            tournament_id,
            archetype: "Burn".to_string(),
            placement: "1".to_string(),
            player: "Bob".to_string(),
            deck_name: "Burn".to_string(),
            url: "https://www.mtgtop8.com/event?e=5&d=9&f=MO".to_string(),
        };
        store.insert_tournament_entry(&entry, OnConflict::Fail).unwrap();
        let entry_id = store.tournament_entry_id(&entry.key()).unwrap();
        for (name, is_mainboard, quantity) in cards {
            let card = EntryCard {
                entry_id,
                card_name: name.to_string(),
                is_mainboard: *is_mainboard,
                quantity: *quantity,
            };
            store.insert_entry_card(&card, OnConflict::Fail).unwrap();
        }
        store
    }

    #[test]
    fn test_clean_deck_has_no_findings() {
        let store = seeded(&[
            ("Lightning Bolt", true, 4),
            ("Monastery Swiftspear", true, 4),
            ("Smash to Smithereens", false, 3),
        ]);
        let report = store.audit().unwrap();

        assert!(report.is_clean());
        assert_eq!(report.counts.cards, 3);
    }

    #[test]
    fn test_flags_every_check() {
        let store = seeded(&[
            ("Mountain", true, 58),
            ("Lightning Bolt", true, 4),
            ("Unknown Card", false, 16),
        ]);
        let report = store.audit().unwrap();

        assert_eq!(report.oversized_mainboards[0].count, 62);
        assert_eq!(report.oversized_sideboards[0].count, 16);
        assert_eq!(report.excess_copies.len(), 2);
        assert_eq!(report.unknown_card_decks, vec!["https://www.mtgtop8.com/event?e=5&d=9&f=MO".to_string()]);
    }
}

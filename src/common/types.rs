use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the process runs against production data.
///
/// Production inserts are strict and the outer crawl driver logs-and-continues
/// past a failed crawl; development inserts are tolerant and failures propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            RunMode::Production
        } else {
            RunMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, RunMode::Production)
    }

    pub fn insert_mode(self) -> InsertMode {
        match self {
            RunMode::Production => InsertMode::Strict,
            RunMode::Development => InsertMode::Tolerant,
        }
    }
}

/// How the ingestion writer treats a natural-key collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// A duplicate natural key aborts the enclosing unit of work.
    Strict,
    /// A duplicate natural key is logged and skipped.
    Tolerant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentInfo {
    pub name: String,
    /// Normalized `mm/dd/yyyy`.
    pub date: String,
    pub format: String,
    pub size: Option<u32>,
    pub url: String,
}

impl TournamentInfo {
    pub fn key(&self) -> TournamentKey {
        TournamentKey {
            name: self.name.clone(),
            date: self.date.clone(),
            format: self.format.clone(),
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TournamentKey {
    pub name: String,
    pub date: String,
    pub format: String,
    pub url: String,
}

impl fmt::Display for TournamentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.name, self.date, self.format, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentEntry {
    pub tournament_id: i64,
    pub archetype: String,
    /// Rank label as printed by the site ("1", "3-4", "Top 8"...), kept verbatim.
    pub placement: String,
    pub player: String,
    pub deck_name: String,
    pub url: String,
}

impl TournamentEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            tournament_id: self.tournament_id,
            archetype: self.archetype.clone(),
            placement: self.placement.clone(),
            player: self.player.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub tournament_id: i64,
    pub archetype: String,
    pub placement: String,
    pub player: String,
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.tournament_id, self.archetype, self.placement, self.player
        )
    }
}

/// One card line of a decklist. The whole row is the natural key, so two lines
/// with the same card, board and quantity collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCard {
    pub entry_id: i64,
    pub card_name: String,
    pub is_mainboard: bool,
    pub quantity: u32,
}

impl fmt::Display for EntryCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.entry_id, self.card_name, self.is_mainboard, self.quantity
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPrice {
    pub card_name: String,
    pub printing_code: String,
    pub date: NaiveDate,
    pub price: f64,
    pub is_paper: bool,
}

impl fmt::Display for CardPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.card_name, self.printing_code, self.date, self.is_paper
        )
    }
}

/// A card printing whose price history should be backfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTarget {
    pub card_name: String,
    pub printing_code: String,
    /// Set name as used in the pricing site's URLs, e.g. "Commander 2018".
    pub printing_name: String,
    #[serde(default)]
    pub foil: bool,
}

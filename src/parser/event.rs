use super::{class_selector, find_link, resolve_url, text_of};
use crate::common::constants::{
    DECK_URL_REGEX, EVENT_SIZE_CLASS, EVENT_SIZE_REGEX, PLAYER_CLASS, RANK_CLASS,
    RANK_FALLBACK_CLASS,
};
use crate::common::error::ParseError;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Class markers that identify a placement row on an event page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMarker {
    /// The highlighted (currently selected) placement.
    Chosen,
    Hover,
}

impl RowMarker {
    pub const ALL: [RowMarker; 2] = [RowMarker::Chosen, RowMarker::Hover];

    pub fn class_name(self) -> &'static str {
        match self {
            RowMarker::Chosen => "chosen_tr",
            RowMarker::Hover => "hover_tr",
        }
    }

    #[cfg(test)]
    fn from_class(class: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.class_name() == class)
    }
}

static PLACEMENT_ROW: Lazy<Selector> = Lazy::new(|| {
    let selector = RowMarker::ALL
        .iter()
        .map(|m| format!(".{}", m.class_name()))
        .collect::<Vec<_>>()
        .join(", ");
    Selector::parse(&selector).expect("valid placement row selector")
});
static SIZE_TEXT: Lazy<Selector> = Lazy::new(|| class_selector(EVENT_SIZE_CLASS));
static RANK: Lazy<Selector> = Lazy::new(|| class_selector(RANK_CLASS));
static RANK_FALLBACK: Lazy<Selector> = Lazy::new(|| class_selector(RANK_FALLBACK_CLASS));
static PLAYER: Lazy<Selector> = Lazy::new(|| class_selector(PLAYER_CLASS));

/// One placement row of an event page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    /// Absolute URL of the decklist page.
    pub url: String,
    pub deck_name: String,
    pub rank: String,
    pub player: String,
}

#[derive(Debug, Default)]
pub struct EventPage {
    pub entries: Vec<EntrySummary>,
    /// Player count, when the page states one.
    pub size: Option<u32>,
    pub rejected: Vec<ParseError>,
}

/// Recovers the player count from the first `"<N> players"` text.
pub fn event_size(document: &Html) -> Option<u32> {
    document.select(&SIZE_TEXT).find_map(|text| {
        EVENT_SIZE_REGEX
            .captures(&text_of(text))
            .and_then(|caps| caps[1].parse().ok())
    })
}

/// Reads deck link, rank and player from one placement row.
pub fn extract_entry(row: ElementRef<'_>, base: &Url) -> Result<EntrySummary, ParseError> {
    let deck_link = find_link(row, &DECK_URL_REGEX).ok_or_else(|| ParseError::MissingElement {
        element: "deck link",
        context: text_of(row),
    })?;
    let href = deck_link.value().attr("href").unwrap_or_default();
    // Deck links are relative query strings ("?e=..&d=..&f=..") on the event page.
    let url = resolve_url(base, &format!("event{href}"))?;

    let rank = row
        .select(&RANK)
        .next()
        .or_else(|| row.select(&RANK_FALLBACK).next())
        .map(text_of)
        .ok_or_else(|| ParseError::MissingElement {
            element: RANK_CLASS,
            context: url.clone(),
        })?;
    let player = row
        .select(&PLAYER)
        .next()
        .map(text_of)
        .ok_or_else(|| ParseError::MissingElement {
            element: PLAYER_CLASS,
            context: url.clone(),
        })?;

    Ok(EntrySummary {
        url,
        deck_name: text_of(deck_link),
        rank,
        player,
    })
}

/// Extracts placement rows and the player count from an event page.
pub fn extract_event(html: &str, base: &Url) -> EventPage {
    let document = Html::parse_document(html);
    let mut page = EventPage {
        size: event_size(&document),
        ..EventPage::default()
    };

    let mut seen = HashSet::new();
    let rows = document
        .select(&PLACEMENT_ROW)
        .filter(|row| find_link(*row, &DECK_URL_REGEX).is_some());
    for row in rows {
        match extract_entry(row, base) {
            // Nested placement rows surface the same deck link twice.
            Ok(entry) if !seen.insert(entry.url.clone()) => {}
            Ok(entry) => page.entries.push(entry),
            Err(e) => page.rejected.push(e),
        }
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.mtgtop8.com/event?e=101&f=LE").unwrap()
    }

    const EVENT_PAGE: &str = r#"
        <html><body>
          <div class="S14">Legacy Challenge - 64 players - 04/07/19</div>
          <div class="chosen_tr">
            <div class="W14">1</div>
            <div class="S14"><a href="?e=101&d=9001&f=LE">Delver</a></div>
            <div class="G11"><a href="search?player=Alice">Alice</a></div>
          </div>
          <div class="hover_tr">
            <div class="S14">3-4</div>
            <div class="S14"><a href="?e=101&d=9002&f=LE">Sneak and Show</a></div>
            <div class="G11">Bob</div>
          </div>
          <div class="hover_tr">
            <div class="S14"><a href="?e=101&d=9003&f=LE">Lands</a></div>
          </div>
          <div class="hover_tr"><a href="format?f=LE">Legacy</a></div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_entries_and_size() {
        let page = extract_event(EVENT_PAGE, &base());

        assert_eq!(page.size, Some(64));
        assert_eq!(page.entries.len(), 2);
        assert_eq!(
            page.entries[0],
            EntrySummary {
                url: "https://www.mtgtop8.com/event?e=101&d=9001&f=LE".to_string(),
                deck_name: "Delver".to_string(),
                rank: "1".to_string(),
                player: "Alice".to_string(),
            }
        );
        assert_eq!(page.entries[1].rank, "3-4");
        assert_eq!(page.entries[1].player, "Bob");
    }

    #[test]
    fn test_row_without_player_is_rejected() {
        let page = extract_event(EVENT_PAGE, &base());
        assert_eq!(page.rejected.len(), 1);
        assert!(matches!(
            page.rejected[0],
            ParseError::MissingElement { element: PLAYER_CLASS, .. }
        ));
    }

    #[test]
    fn test_missing_size_is_none() {
        let page = extract_event("<html><body><div class=\"S14\">Top 8</div></body></html>", &base());
        assert_eq!(page.size, None);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_row_marker_closed_set() {
        assert_eq!(RowMarker::from_class("chosen_tr"), Some(RowMarker::Chosen));
        assert_eq!(RowMarker::from_class("hover_tr"), Some(RowMarker::Hover));
        assert_eq!(RowMarker::from_class("S14"), None);
    }
}

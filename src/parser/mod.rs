//! HTML record extraction for tournament listings, event pages, decklists and price charts.
//!
//! Extractors take raw markup and return owned records. `scraper::Html` never
//! leaves this module's functions, so callers can hold the results across awaits.

pub mod archetype;
pub mod dates;
pub mod deck;
pub mod event;
pub mod listing;
pub mod price;

pub use archetype::resolve_archetype;
pub use dates::{normalize_listing_date, parse_normalized_date};
pub use deck::{extract_cards, read_deck_page, CardLine, DeckPage};
pub use event::{extract_entry, extract_event, EntrySummary, EventPage, RowMarker};
pub use listing::{extract_listing, EventCandidate, ListingPage};
pub use price::{extract_price_points, pricing_url, split_price_series, PricePoint, PriceSeries};

use crate::common::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Selector};

pub(crate) static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Builds a `.class` selector for one of the site's class markers.
pub(crate) fn class_selector(class: &str) -> Selector {
    Selector::parse(&format!(".{class}")).expect("class markers are valid selectors")
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First link under `element` whose href matches `pattern`.
pub(crate) fn find_link<'a>(element: ElementRef<'a>, pattern: &Regex) -> Option<ElementRef<'a>> {
    element.select(&LINK_SELECTOR).find(|link| {
        link.value()
            .attr("href")
            .map_or(false, |href| pattern.is_match(href))
    })
}

pub(crate) fn resolve_url(base: &Url, href: &str) -> Result<String, ParseError> {
    base.join(href)
        .map(|url| url.to_string())
        .map_err(|e| ParseError::BadUrl {
            input: href.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_of_collapses_whitespace() {
        let doc = Html::parse_fragment("<div>  Modern \n  Challenge <b>32</b> </div>");
        let div = doc.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(text_of(div), "Modern Challenge 32");
    }

    #[test]
    fn test_resolve_relative_href() {
        let base = Url::parse("https://www.mtgtop8.com/format?f=LE&meta=16").unwrap();
        assert_eq!(
            resolve_url(&base, "event?e=7018&f=LE").unwrap(),
            "https://www.mtgtop8.com/event?e=7018&f=LE"
        );
    }
}

use super::archetype::resolve_archetype;
use super::{class_selector, text_of};
use crate::common::constants::{
    CARD_NAME_CLASS, CARD_QUANTITY_CLASS, CARD_ROW_CLASS, MAINBOARD_HEADER_TEXTS,
    SECTION_HEADER_CLASS, SIDEBOARD_HEADER_TEXT,
};
use crate::common::error::ParseError;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static CARD_ROW: Lazy<Selector> = Lazy::new(|| class_selector(CARD_ROW_CLASS));
static CARD_NAME: Lazy<Selector> = Lazy::new(|| class_selector(CARD_NAME_CLASS));
static CARD_QUANTITY: Lazy<Selector> = Lazy::new(|| class_selector(CARD_QUANTITY_CLASS));
static SECTION_HEADER: Lazy<Selector> = Lazy::new(|| class_selector(SECTION_HEADER_CLASS));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLine {
    pub name: String,
    pub is_mainboard: bool,
    pub quantity: u32,
}

/// Everything the pipeline needs from a decklist page.
#[derive(Debug)]
pub struct DeckPage {
    pub archetype: String,
    pub cards: Vec<CardLine>,
    pub rejected: Vec<ParseError>,
}

/// Walks backward from the card's container looking for the nearest section header.
///
/// A header mentioning the sideboard puts the card in the sideboard; one naming the
/// main deck, or reaching the start of the list, keeps it in the mainboard.
pub fn card_in_mainboard(card: ElementRef<'_>) -> bool {
    let anchor = card
        .parent()
        .and_then(ElementRef::wrap)
        .unwrap_or(card);

    for sibling in anchor.prev_siblings().filter_map(ElementRef::wrap) {
        let Some(header) = sibling.select(&SECTION_HEADER).last() else {
            continue;
        };
        let title = text_of(header).to_lowercase();
        if title.contains(SIDEBOARD_HEADER_TEXT) {
            return false;
        }
        if MAINBOARD_HEADER_TEXTS.iter().any(|t| title.contains(*t)) {
            return true;
        }
    }
    true
}

fn parse_quantity(text: &str) -> Result<u32, ParseError> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<u32>().ok())
        .filter(|quantity| *quantity > 0)
        .ok_or_else(|| ParseError::BadQuantity {
            input: text.to_string(),
        })
}

fn extract_card(card: ElementRef<'_>) -> Result<CardLine, ParseError> {
    let name = card
        .select(&CARD_NAME)
        .next()
        .map(text_of)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ParseError::MissingElement {
            element: CARD_NAME_CLASS,
            context: text_of(card),
        })?;
    let quantity_text = card
        .select(&CARD_QUANTITY)
        .next()
        .map(text_of)
        .ok_or_else(|| ParseError::MissingElement {
            element: CARD_QUANTITY_CLASS,
            context: name.clone(),
        })?;

    Ok(CardLine {
        quantity: parse_quantity(&quantity_text)?,
        is_mainboard: card_in_mainboard(card),
        name,
    })
}

/// Every card row of a decklist, in page order.
pub fn extract_cards(document: &Html) -> Vec<Result<CardLine, ParseError>> {
    document.select(&CARD_ROW).map(extract_card).collect()
}

/// Parses a decklist page into its archetype and card lines.
pub fn read_deck_page(html: &str, deck_name: &str) -> DeckPage {
    let document = Html::parse_document(html);
    let archetype = resolve_archetype(&document, deck_name);

    let mut cards = Vec::new();
    let mut rejected = Vec::new();
    for card in extract_cards(&document) {
        match card {
            Ok(card) => cards.push(card),
            Err(e) => rejected.push(e),
        }
    }

    DeckPage {
        archetype,
        cards,
        rejected,
    }
}

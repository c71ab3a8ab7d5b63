use super::{find_link, text_of};
use crate::common::constants::{
    ARCHETYPE_LINK_SUFFIX, ARCHETYPE_URL_REGEX, MANA_CONTAINER_CLASS, MANA_PIP_REGEX,
    UNKNOWN_ARCHETYPE,
};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

static MANA_IMAGES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!(".{MANA_CONTAINER_CLASS} img[src]")).expect("valid mana selector")
});

/// Archetype named by the deck's archetype link, minus a trailing "decks".
fn archetype_from_link(document: &Html) -> Option<String> {
    let link = find_link(document.root_element(), &ARCHETYPE_URL_REGEX)?;
    let text = text_of(link);
    let label = text
        .strip_suffix(ARCHETYPE_LINK_SUFFIX)
        .unwrap_or(&text)
        .trim()
        .to_string();
    (!label.is_empty()).then_some(label)
}

/// Color identity spelled by the mana pips in the deck title, e.g. `"uw"`.
/// Repeated pips count once, so the result is a de-duplicated color identity.
fn archetype_from_mana(document: &Html) -> Option<String> {
    let colors: BTreeSet<char> = document
        .select(&MANA_IMAGES)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| MANA_PIP_REGEX.captures(src))
        .filter_map(|caps| caps[1].chars().next())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!colors.is_empty()).then(|| colors.into_iter().collect())
}

/// Resolves a deck's archetype: explicit archetype link, then mana-pip color
/// identity, then the deck name itself. Never returns an empty label.
pub fn resolve_archetype(document: &Html, fallback_deck_name: &str) -> String {
    archetype_from_link(document)
        .or_else(|| archetype_from_mana(document))
        .unwrap_or_else(|| {
            let name = fallback_deck_name.trim();
            if name.is_empty() {
                UNKNOWN_ARCHETYPE.to_string()
            } else {
                name.to_string()
            }
        })
}

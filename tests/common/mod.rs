#![allow(dead_code)]

use async_trait::async_trait;
use mtg_meta_scraper::fetch::{FormData, PageSource};
use mtg_meta_scraper::{Result, ScraperError};
use std::collections::HashMap;
use std::sync::Mutex;

pub const LEGACY_URL: &str = "https://www.mtgtop8.com/format?f=LE&meta=16";

/// Serves canned pages keyed by url (plus form payload for POSTs) and records every request.
#[derive(Default)]
pub struct FixtureSource {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

fn request_key(url: &str, form: Option<&FormData>) -> String {
    match form {
        Some(form) => {
            let payload: Vec<String> = form.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{url} [{}]", payload.join("&"))
        }
        None => url.to_string(),
    }
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn listing(mut self, url: &str, page: u32, html: impl Into<String>) -> Self {
        let form = vec![("cp".to_string(), page.to_string())];
        self.pages.insert(request_key(url, Some(&form)), html.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for FixtureSource {
    async fn fetch(&self, url: &str, form: Option<&FormData>) -> Result<String> {
        let key = request_key(url, form);
        self.requests.lock().unwrap().push(key.clone());
        self.pages.get(&key).cloned().ok_or(ScraperError::Fetch {
            url: url.to_string(),
            status: 404,
        })
    }
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {path}: {e}"))
}

/// Listing page markup: a results table plus the "Last major events" sidebar.
pub fn listing_page(events: &[(u32, &str, &str)]) -> String {
    let rows: String = events
        .iter()
        .map(|(id, name, date)| {
            format!(
                r#"<tr class="hover_tr"><td class="S12"><a href="event?e={id}&f=LE">{name}</a></td><td class="S10">{date}</td></tr>"#
            )
        })
        .collect();
    fixture("listing_page.html").replace("{{ROWS}}", &rows)
}

pub fn event_url(id: u32) -> String {
    format!("https://www.mtgtop8.com/event?e={id}&f=LE")
}

pub fn deck_url(event: u32, deck: u32) -> String {
    format!("https://www.mtgtop8.com/event?e={event}&d={deck}&f=LE")
}

/// Event page with one placement row per `(deck id, rank, deck name, player)`.
pub fn event_page(event: u32, players: u32, entries: &[(u32, &str, &str, &str)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(deck, rank, deck_name, player)| {
            format!(
                r#"<div class="hover_tr">
                     <div class="S14">{rank}</div>
                     <div class="S14"><a href="?e={event}&d={deck}&f=LE">{deck_name}</a></div>
                     <div class="G11"><a href="search?player={player}">{player}</a></div>
                   </div>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>
             <div class="S14">Legacy event - {players} players - 04/07/19</div>
             {rows}
           </body></html>"#
    )
}

/// Decklist page. Cards are `(quantity, name)`; a quantity of "x" is malformed.
pub fn deck_page(archetype_link: Option<&str>, main: &[(&str, &str)], side: &[(&str, &str)]) -> String {
    let cards = |cards: &[(&str, &str)]| -> String {
        cards
            .iter()
            .map(|(quantity, name)| {
                format!(
                    r#"<div class="G14"><div class="hover_tr">{quantity} <span class="L14">{name}</span></div></div>"#
                )
            })
            .collect()
    };
    let archetype = archetype_link
        .map(|label| format!(r#"<div class="S14"><a href="archetype?a=12&meta=16&f=LE">{label}</a></div>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body>
             <div class="event_title">#1 Deck <img src="/graph/manas/u.png"><img src="/graph/manas/b.png"></div>
             {archetype}
             <div class="deck">
               <div class="section"><div class="O13">60 Cards</div></div>
               <div class="cards">{}</div>
               <div class="section"><div class="O13">Sideboard</div></div>
               <div class="cards">{}</div>
             </div>
           </body></html>"#,
        cards(main),
        cards(side)
    )
}

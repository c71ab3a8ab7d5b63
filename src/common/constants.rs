/// Site markers and URL patterns shared by the extractors.
///
/// These are the wire contract with mtgtop8.com and mtggoldfish.com; any change in
/// the sites' markup has to be reflected here.
use once_cell::sync::Lazy;
use regex::Regex;

pub const TOURNAMENT_SITE: &str = "mtgtop8";
pub const PRICING_SITE: &str = "mtggoldfish";

/// Form field carrying the listing page number.
pub const PAGE_FORM_FIELD: &str = "cp";

// Structural class markers
pub const LISTING_DATE_CLASS: &str = "S10";
pub const EVENT_SIZE_CLASS: &str = "S14";
pub const RANK_CLASS: &str = "W14";
pub const RANK_FALLBACK_CLASS: &str = "S14";
pub const PLAYER_CLASS: &str = "G11";
pub const CARD_ROW_CLASS: &str = "G14";
pub const CARD_NAME_CLASS: &str = "L14";
pub const CARD_QUANTITY_CLASS: &str = "hover_tr";
pub const SECTION_HEADER_CLASS: &str = "O13";
pub const MANA_CONTAINER_CLASS: &str = "event_title";

/// Raw-markup needles for the "Last major events" sidebar.
pub const SIDEBAR_TITLE_MARKUP: &str = r#"class="w_title""#;
pub const SIDEBAR_TITLE_TEXT: &str = "Last major events";

pub const SIDEBOARD_HEADER_TEXT: &str = "sideboard";
pub const MAINBOARD_HEADER_TEXTS: &[&str] = &["mainboard", "main deck"];
pub const ARCHETYPE_LINK_SUFFIX: &str = "decks";
pub const UNKNOWN_ARCHETYPE: &str = "Unknown";

/// Listing pages normally carry at least this many events; fewer is logged but
/// does not end the crawl.
pub const MIN_EVENTS_PER_PAGE: usize = 5;

/// Event listing links that are known to point at malformed events.
pub const MALFORMED_EVENT_URLS: &[&str] = &["https://www.mtgtop8.com/event?e=7018&f=LE"];

pub static EVENT_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"event\?e=[0-9]+&f=[A-Z]+").expect("valid event url regex"));
pub static DECK_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?e=[0-9]+&d=[0-9]+&f=[A-Z]+").expect("valid deck url regex"));
pub static ARCHETYPE_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"archetype?\?a=[0-9]+").expect("valid archetype url regex"));
pub static EVENT_SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+) players").expect("valid event size regex"));
pub static MANA_PIP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"graph/manas/([A-Za-z])\.png").expect("valid mana pip regex"));

/// `d += "\n2019-01-02, 3.45";` lines from the price chart script. The newline may
/// appear either escaped in the script source or as a literal character.
pub static DATE_PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"d \+?= "(?:\\n|\n)([0-9]{4}-[0-9]{2}-[0-9]{2}), ([0-9]+\.[0-9]{1,2})";"#)
        .expect("valid date/price regex")
});

pub const DEFAULT_PRICING_BASE_URL: &str = "https://www.mtggoldfish.com/price/";

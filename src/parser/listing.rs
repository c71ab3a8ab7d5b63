use super::{class_selector, find_link, resolve_url, text_of};
use crate::common::constants::{
    EVENT_URL_REGEX, LISTING_DATE_CLASS, MALFORMED_EVENT_URLS, SIDEBAR_TITLE_MARKUP,
    SIDEBAR_TITLE_TEXT,
};
use crate::common::error::ParseError;
use crate::parser::dates::normalize_listing_date;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

static HOVER_ROW: Lazy<Selector> = Lazy::new(|| class_selector("hover_tr"));
static DATE_CELL: Lazy<Selector> = Lazy::new(|| class_selector(LISTING_DATE_CLASS));

/// An event discovered on a format's listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCandidate {
    pub name: String,
    /// Normalized `mm/dd/yyyy`.
    pub date: String,
    /// Absolute event page URL.
    pub url: String,
}

#[derive(Debug, Default)]
pub struct ListingPage {
    /// Event rows left after the link and sidebar filters, before dates are parsed.
    pub matched_rows: usize,
    pub events: Vec<EventCandidate>,
    /// Rows dropped because a field could not be parsed.
    pub rejected: Vec<ParseError>,
    /// Rows dropped by the malformed-event deny-list.
    pub denied: Vec<String>,
}

impl ListingPage {
    /// The listing is exhausted once no event row survives the filters.
    pub fn is_final(&self) -> bool {
        self.matched_rows == 0
    }
}

/// Rows listed under the "Last major events" sidebar repeat events from other
/// pages. The check looks at the raw markup of every preceding sibling.
fn under_major_events_sidebar(row: ElementRef<'_>) -> bool {
    row.prev_siblings().filter_map(ElementRef::wrap).any(|sibling| {
        let markup = sibling.html();
        markup.contains(SIDEBAR_TITLE_MARKUP) && markup.contains(SIDEBAR_TITLE_TEXT)
    })
}

fn parse_listing_row(
    row: ElementRef<'_>,
    link: ElementRef<'_>,
    url: String,
) -> Result<EventCandidate, ParseError> {
    let date_cell = row
        .select(&DATE_CELL)
        .next()
        .ok_or_else(|| ParseError::MissingElement {
            element: LISTING_DATE_CLASS,
            context: url.clone(),
        })?;
    let date = normalize_listing_date(&text_of(date_cell))?;
    Ok(EventCandidate {
        name: text_of(link),
        date,
        url,
    })
}

/// Extracts the candidate events of one listing page.
pub fn extract_listing(html: &str, base: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let rows: Vec<(ElementRef<'_>, ElementRef<'_>)> = document
        .select(&HOVER_ROW)
        .filter_map(|row| find_link(row, &EVENT_URL_REGEX).map(|link| (row, link)))
        .filter(|(row, _)| !under_major_events_sidebar(*row))
        .collect();

    let mut page = ListingPage {
        matched_rows: rows.len(),
        ..ListingPage::default()
    };

    for (row, link) in rows {
        let href = link.value().attr("href").unwrap_or_default();
        let url = match resolve_url(base, href) {
            Ok(url) => url,
            Err(e) => {
                page.rejected.push(e);
                continue;
            }
        };
        if MALFORMED_EVENT_URLS.contains(&url.as_str()) {
            page.denied.push(url);
            continue;
        }
        match parse_listing_row(row, link, url) {
            Ok(candidate) => page.events.push(candidate),
            Err(e) => page.rejected.push(e),
        }
    }

    page
}

use crate::common::error::ParseError;
use chrono::NaiveDate;

/// Listing pages print event dates as `dd/mm/yy`.
pub const SOURCE_DATE_FORMAT: &str = "%d/%m/%y";
/// Stored tournament dates are `mm/dd/yyyy`.
pub const NORMALIZED_DATE_FORMAT: &str = "%m/%d/%Y";

/// Converts a listing date (`dd/mm/yy`) into the stored `mm/dd/yyyy` form.
pub fn normalize_listing_date(raw: &str) -> Result<String, ParseError> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, SOURCE_DATE_FORMAT).map_err(|e| {
        ParseError::BadDate {
            input: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(date.format(NORMALIZED_DATE_FORMAT).to_string())
}

/// Parses a stored `mm/dd/yyyy` date back into a calendar date.
pub fn parse_normalized_date(normalized: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(normalized.trim(), NORMALIZED_DATE_FORMAT).map_err(|e| {
        ParseError::BadDate {
            input: normalized.to_string(),
            reason: e.to_string(),
        }
    })
}

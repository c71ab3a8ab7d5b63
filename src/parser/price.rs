use crate::common::constants::DATE_PRICE_REGEX;
use crate::common::error::ParseError;
use crate::common::types::PriceTarget;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Default, PartialEq)]
pub struct PriceSeries {
    pub paper: Vec<PricePoint>,
    pub online: Vec<PricePoint>,
}

/// Pricing page URL for a printing: `<base><printing>[:Foil]/<card>#paper`,
/// with spaces in both names joined by `+`.
pub fn pricing_url(base: &str, target: &PriceTarget) -> String {
    let plus_joined = |s: &str| s.split(' ').collect::<Vec<_>>().join("+");
    format!(
        "{}{}{}/{}#paper",
        base,
        plus_joined(&target.printing_name),
        if target.foil { ":Foil" } else { "" },
        plus_joined(&target.card_name)
    )
}

/// All date/price pairs embedded in the page's chart script, in page order.
pub fn extract_price_points(page: &str) -> Vec<Result<PricePoint, ParseError>> {
    DATE_PRICE_REGEX
        .captures_iter(page)
        .map(|caps| {
            let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").map_err(|e| {
                ParseError::BadDate {
                    input: caps[1].to_string(),
                    reason: e.to_string(),
                }
            })?;
            let price = caps[2].parse::<f64>().map_err(|_| ParseError::BadPrice {
                input: caps[2].to_string(),
            })?;
            Ok(PricePoint { date, price })
        })
        .collect()
}

/// Splits the chart points into the paper and online series.
///
/// Input contract: the page lists the paper series in increasing date order,
/// followed by the online series in its own increasing run. The first point and
/// every point dated after the last accepted paper point is paper; any point that
/// breaks that monotonicity is online. This is not a general-purpose sorter.
pub fn split_price_series(points: &[PricePoint]) -> PriceSeries {
    let mut series = PriceSeries::default();
    let mut last_paper: Option<NaiveDate> = None;
    for point in points {
        if last_paper.map_or(true, |last| point.date > last) {
            last_paper = Some(point.date);
            series.paper.push(*point);
        } else {
            series.online.push(*point);
        }
    }
    series
}

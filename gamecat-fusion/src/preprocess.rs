//! Source preprocessing
//!
//! Turns a [`SourceTable`] into keyed, deduplicated [`SourceRecord`]s:
//!
//! 1. drop rows with no name, then bundle/junk listings
//! 2. parse the release year from heterogeneous date text
//! 3. resolve platform flags (explicit columns or free-text description)
//! 4. apply the review-count floor (primary source only)
//! 5. derive canonical keys, drop unkeyable rows, keep one row per key
//!
//! Columns irrelevant to modeling never make it into [`SourceRecord`], so the
//! drop happens by construction; they are only recorded in the stats.

use crate::normalize::{is_bundle_or_junk, normalize};
use crate::record::{PlatformFlags, SourceRecord, TaxonomyText};
use crate::sources::{DedupOrder, Field, RawSourceRecord, SourceTable};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use gamecat_common::config::PipelineParams;
use gamecat_common::diagnostics::PreprocessStats;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};

/// Accepted full-date formats, tried in order
const DATE_FORMATS: [&str; 8] = [
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Plausible release years; anything outside is treated as unparsable
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1950..=2100;

/// Preprocess one source table
pub fn preprocess_source(
    table: SourceTable,
    params: &PipelineParams,
) -> (Vec<SourceRecord>, PreprocessStats) {
    let source = table.id();
    let schema = table.schema.clone();
    let explicit_platforms = [Field::Windows, Field::Mac, Field::Linux]
        .iter()
        .any(|&f| table.has_field(f));
    let apply_floor = schema.popularity_floor && table.has_field(Field::Reviews);

    let mut stats = PreprocessStats {
        source: source.to_string(),
        input_records: table.records.len(),
        missing_optional_columns: table
            .missing_optional
            .iter()
            .filter_map(|&f| schema.column(f).map(|c| c.column.to_string()))
            .collect(),
        dropped_columns: table.unmapped_columns.clone(),
        ..Default::default()
    };

    let mut records = Vec::with_capacity(table.records.len());
    for raw in table.records {
        let Some(name) = raw.get(Field::Name).map(str::to_string) else {
            stats.dropped_missing_name += 1;
            continue;
        };
        if is_bundle_or_junk(Some(&name)) {
            stats.dropped_junk += 1;
            continue;
        }

        let release_year = match raw.get(Field::ReleaseDate) {
            Some(text) => {
                let year = parse_release_year(text);
                if year.is_none() {
                    stats.unparsable_dates += 1;
                }
                year
            }
            None => None,
        };

        let price = match raw.get(Field::Price) {
            Some(text) => match parse_price(text, schema.price_in_minor_units) {
                Some(price) => Some(price),
                None => {
                    stats.unparsable_prices += 1;
                    schema.price_default
                }
            },
            None => schema.price_default,
        };

        let platforms = if explicit_platforms {
            Some(PlatformFlags {
                windows: raw.get(Field::Windows).map(parse_bool).unwrap_or(false),
                mac: raw.get(Field::Mac).map(parse_bool).unwrap_or(false),
                linux: raw.get(Field::Linux).map(parse_bool).unwrap_or(false),
            })
        } else {
            raw.get(Field::Platforms).map(PlatformFlags::from_description)
        };

        let reviews = raw.get(Field::Reviews).and_then(parse_count);
        if apply_floor && reviews.unwrap_or(0) < params.steam_min_reviews {
            stats.dropped_below_floor += 1;
            continue;
        }

        let key = match normalize(Some(&name)) {
            Some(key) if !key.is_empty() => key,
            _ => {
                stats.dropped_unkeyable += 1;
                continue;
            }
        };

        records.push(SourceRecord {
            source,
            key,
            name,
            price,
            release_year,
            platforms,
            reviews,
            quality_score: raw.get(Field::QualityScore).and_then(parse_number),
            header_image: raw.get(Field::HeaderImage).map(str::to_string),
            taxonomy: taxonomy_text(&raw),
        });
    }

    let before = records.len();
    let records = dedup_by_key(records, schema.dedup_order);
    stats.dropped_duplicates = before - records.len();
    stats.output_records = records.len();

    debug!("Preprocess stats: {:?}", stats);
    info!("Preprocessed {}", stats.display_string());
    (records, stats)
}

/// Keep one row per canonical key after a stable sort by the source's order
fn dedup_by_key(mut records: Vec<SourceRecord>, order: DedupOrder) -> Vec<SourceRecord> {
    match order {
        DedupOrder::ReviewsDescending => {
            records.sort_by(|a, b| descending_none_last(a.reviews, b.reviews));
        }
        DedupOrder::PriceAscending => {
            records.sort_by(|a, b| match (a.price, b.price) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
    }

    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.key.clone()))
        .collect()
}

fn descending_none_last(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn taxonomy_text(raw: &RawSourceRecord) -> TaxonomyText {
    let text = |field| raw.get(field).map(str::to_string);
    TaxonomyText {
        genres: text(Field::Genres),
        tags: text(Field::Tags),
        categories: text(Field::Categories),
        developers: text(Field::Developers),
        publishers: text(Field::Publishers),
        languages: text(Field::Languages),
    }
}

/// Extract a release year from heterogeneous date text
///
/// Accepts full dates in several orders, ISO/RFC 3339 timestamps, month-year
/// ("Aug 2015") and bare years. Returns `None` when nothing matches.
pub fn parse_release_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let year = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|d| d.year())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.year()))
        .or_else(|| {
            let trimmed = text.trim_end_matches('Z');
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|d| d.year())
        })
        .or_else(|| {
            let padded = format!("1 {}", text.replace(',', ""));
            ["%d %b %Y", "%d %B %Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&padded, fmt).ok())
                .map(|d| d.year())
        })
        .or_else(|| {
            (text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()))
                .then(|| text.parse::<i32>().ok())
                .flatten()
        })?;

    YEAR_RANGE.contains(&year).then_some(year)
}

/// Parse a price cell; minor units are converted to major units
fn parse_price(text: &str, minor_units: bool) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .replace(',', "");
    if cleaned.eq_ignore_ascii_case("free") {
        return Some(0.0);
    }
    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)?;
    Some(if minor_units { value / 100.0 } else { value })
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Review counts sometimes arrive as floats ("1523.0")
fn parse_count(text: &str) -> Option<u64> {
    let value = parse_number(text)?;
    (value >= 0.0).then(|| value.round() as u64)
}

fn parse_bool(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "t"
    )
}

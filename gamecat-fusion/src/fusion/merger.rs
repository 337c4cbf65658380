// Catalog fusion engine
//
// Full outer join of the two preprocessed sources on canonical key, followed
// by priority coalescing (primary -> secondary -> central default) and
// release-year imputation.

use super::conflict::{self, ConflictReport};
use crate::normalize::CanonicalKey;
use crate::record::{
    FeatureOverrides, FusedRecord, PlatformFlags, RecordOrigin, SourceRecord, StorePresence,
    TaxonomyText,
};
use gamecat_common::config::{PipelineParams, YearImputation};
use gamecat_common::diagnostics::FusionStats;
use gamecat_common::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FusionOutput {
    pub records: Vec<FusedRecord>,
    pub conflicts: Vec<ConflictReport>,
    pub stats: FusionStats,
}

/// Join both sources and coalesce every field by source priority
///
/// Each input must already be unique per key (preprocessing guarantees it);
/// a duplicate is reported as [`Error::InvalidInput`]. Output is ordered by
/// canonical key and unique per key.
pub fn fuse_sources(
    primary: Vec<SourceRecord>,
    secondary: Vec<SourceRecord>,
    params: &PipelineParams,
) -> Result<FusionOutput> {
    let mut joined: BTreeMap<CanonicalKey, (Option<SourceRecord>, Option<SourceRecord>)> =
        BTreeMap::new();

    for record in primary {
        let slot = joined.entry(record.key.clone()).or_default();
        if slot.0.is_some() {
            return Err(duplicate_key(&record));
        }
        slot.0 = Some(record);
    }
    for record in secondary {
        let slot = joined.entry(record.key.clone()).or_default();
        if slot.1.is_some() {
            return Err(duplicate_key(&record));
        }
        slot.1 = Some(record);
    }

    let mut stats = FusionStats::default();
    let mut conflicts = Vec::new();
    let mut pending = Vec::with_capacity(joined.len());

    for (key, pair) in joined {
        let record = match pair {
            (Some(p), Some(s)) => {
                stats.matched += 1;
                conflicts.extend(detect_conflicts(&key, &p, &s));
                coalesce(key, Some(p), Some(s), &mut stats)
            }
            (Some(p), None) => {
                stats.primary_only += 1;
                coalesce(key, Some(p), None, &mut stats)
            }
            (None, Some(s)) => {
                stats.secondary_only += 1;
                coalesce(key, None, Some(s), &mut stats)
            }
            (None, None) => continue,
        };
        pending.push(record);
    }

    let fill_year = imputed_year(&pending, params);
    let records: Vec<FusedRecord> = pending
        .into_iter()
        .map(|p| {
            let release_year = p.release_year.unwrap_or_else(|| {
                stats.imputed_years += 1;
                fill_year
            });
            FusedRecord {
                release_year,
                ..p.record
            }
        })
        .collect();

    stats.conflicts = conflicts.len();
    stats.output_records = records.len();
    if stats.imputed_years > 0 {
        warn!(
            "{} records had no parsable release year; imputed {}",
            stats.imputed_years, fill_year
        );
    }
    debug!("Fusion stats: {:?}", stats);
    info!("Fused {}", stats.display_string());

    Ok(FusionOutput {
        records,
        conflicts,
        stats,
    })
}

/// Fused record whose release year may still be missing
struct PendingRecord {
    record: FusedRecord,
    release_year: Option<i32>,
}

fn coalesce(
    key: CanonicalKey,
    primary: Option<SourceRecord>,
    secondary: Option<SourceRecord>,
    stats: &mut FusionStats,
) -> PendingRecord {
    let stores = StorePresence {
        on_steam: primary.is_some(),
        on_epic: secondary.is_some(),
    };
    let (p, s) = (primary.as_ref(), secondary.as_ref());

    let price = p.and_then(|r| r.price).or(s.and_then(|r| r.price));
    let platforms = p.and_then(|r| r.platforms).or(s.and_then(|r| r.platforms));
    let reviews = p.and_then(|r| r.reviews).or(s.and_then(|r| r.reviews));
    if price.is_none() {
        stats.defaulted_prices += 1;
    }
    if platforms.is_none() {
        stats.defaulted_platforms += 1;
    }
    if reviews.is_none() {
        stats.defaulted_popularity += 1;
    }

    let name = p
        .or(s)
        .map(|r| r.name.clone())
        .unwrap_or_else(|| key.to_string());
    let release_year = p.and_then(|r| r.release_year).or(s.and_then(|r| r.release_year));
    let quality_score = p.and_then(|r| r.quality_score).or(s.and_then(|r| r.quality_score));
    let header_image = p
        .and_then(|r| r.header_image.clone())
        .or_else(|| s.and_then(|r| r.header_image.clone()));
    let taxonomy = coalesce_taxonomy(
        primary.map(|r| r.taxonomy),
        secondary.map(|r| r.taxonomy),
    );

    PendingRecord {
        record: FusedRecord {
            key,
            name,
            price: price.unwrap_or(0.0),
            release_year: 0,
            platforms: platforms.unwrap_or_default(),
            stores,
            reviews: reviews.unwrap_or(0),
            quality_score: quality_score.unwrap_or(0.0),
            header_image,
            taxonomy,
            origin: RecordOrigin::Fused,
            overrides: FeatureOverrides::default(),
        },
        release_year,
    }
}

fn coalesce_taxonomy(primary: Option<TaxonomyText>, secondary: Option<TaxonomyText>) -> TaxonomyText {
    let p = primary.unwrap_or_default();
    let s = secondary.unwrap_or_default();
    TaxonomyText {
        genres: p.genres.or(s.genres),
        tags: p.tags.or(s.tags),
        categories: p.categories.or(s.categories),
        developers: p.developers.or(s.developers),
        publishers: p.publishers.or(s.publishers),
        languages: p.languages.or(s.languages),
    }
}

fn detect_conflicts(key: &CanonicalKey, p: &SourceRecord, s: &SourceRecord) -> Vec<ConflictReport> {
    [
        conflict::check_names(key, &p.name, &s.name),
        conflict::check_price(key, p.price, s.price),
        conflict::check_year(key, p.release_year, s.release_year),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Year substituted for records with no parsable release date
fn imputed_year(records: &[PendingRecord], params: &PipelineParams) -> i32 {
    match params.year_imputation {
        YearImputation::Fixed => params.default_release_year,
        YearImputation::Median => {
            let mut years: Vec<i32> = records.iter().filter_map(|r| r.release_year).collect();
            if years.is_empty() {
                return params.default_release_year;
            }
            years.sort_unstable();
            let n = years.len();
            if n % 2 == 1 {
                years[n / 2]
            } else {
                (years[n / 2 - 1] + years[n / 2]) / 2
            }
        }
    }
}

fn duplicate_key(record: &SourceRecord) -> Error {
    Error::InvalidInput(format!(
        "source {} has more than one record for key '{}'",
        record.source, record.key
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::canonical_key;
    use crate::record::SourceId;

    fn source(id: SourceId, name: &str) -> SourceRecord {
        SourceRecord {
            source: id,
            key: canonical_key(name),
            name: name.to_string(),
            price: None,
            release_year: None,
            platforms: None,
            reviews: None,
            quality_score: None,
            header_image: None,
            taxonomy: TaxonomyText::default(),
        }
    }

    #[test]
    fn test_primary_wins_and_secondary_fills_gaps() {
        let mut steam = source(SourceId::Steam, "Super Game");
        steam.price = Some(19.99);
        steam.reviews = Some(12000);
        steam.platforms = Some(PlatformFlags {
            windows: true,
            mac: true,
            linux: false,
        });
        let mut epic = source(SourceId::Epic, "Super Game: Deluxe Edition");
        epic.price = Some(29.99);
        epic.release_year = Some(2018);
        epic.taxonomy.genres = Some("Action".to_string());

        let output = fuse_sources(vec![steam], vec![epic], &PipelineParams::default()).unwrap();
        assert_eq!(output.records.len(), 1);
        let fused = &output.records[0];
        assert_eq!(fused.name, "Super Game");
        assert_eq!(fused.price, 19.99);
        assert_eq!(fused.reviews, 12000);
        assert_eq!(fused.release_year, 2018);
        assert!(fused.platforms.mac);
        assert_eq!(fused.taxonomy.genres.as_deref(), Some("Action"));
        assert!(fused.stores.on_steam && fused.stores.on_epic);
        assert_eq!(output.stats.matched, 1);
        assert!(output.conflicts.iter().any(|c| c.field == "price"));
    }

    #[test]
    fn test_defaults_and_fixed_year_imputation() {
        let epic = source(SourceId::Epic, "Lonely Game");
        let output = fuse_sources(vec![], vec![epic], &PipelineParams::default()).unwrap();
        let fused = &output.records[0];
        assert_eq!(fused.price, 0.0);
        assert_eq!(fused.reviews, 0);
        assert_eq!(fused.release_year, 2020);
        assert_eq!(fused.platforms, PlatformFlags::default());
        assert!(fused.stores.is_epic_only());
        assert_eq!(output.stats.imputed_years, 1);
        assert_eq!(output.stats.defaulted_popularity, 1);
    }

    #[test]
    fn test_median_year_imputation() {
        let mut a = source(SourceId::Steam, "A");
        a.release_year = Some(2000);
        let mut b = source(SourceId::Steam, "B");
        b.release_year = Some(2010);
        let mut c = source(SourceId::Steam, "C");
        c.release_year = Some(2016);
        let d = source(SourceId::Epic, "D");
        let params = PipelineParams {
            year_imputation: YearImputation::Median,
            ..Default::default()
        };
        let output = fuse_sources(vec![a, b, c], vec![d], &params).unwrap();
        let d = output.records.iter().find(|r| r.name == "D").unwrap();
        assert_eq!(d.release_year, 2010);
    }

    #[test]
    fn test_keys_unique_after_fusion() {
        let output = fuse_sources(
            vec![source(SourceId::Steam, "Hades"), source(SourceId::Steam, "Celeste")],
            vec![source(SourceId::Epic, "HADES™"), source(SourceId::Epic, "Control")],
            &PipelineParams::default(),
        )
        .unwrap();
        let mut keys: Vec<_> = output.records.iter().map(|r| r.key.clone()).collect();
        let total = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(total, 3);
    }

    #[test]
    fn test_duplicate_key_within_source_rejected() {
        let result = fuse_sources(
            vec![source(SourceId::Steam, "Hades"), source(SourceId::Steam, "Hades")],
            vec![],
            &PipelineParams::default(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}

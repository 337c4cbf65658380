//! Curation layer
//!
//! Applied to the fused table as one deterministic pass:
//!
//! 1. manual insertion (a manual record replaces any automated one sharing
//!    its canonical key)
//! 2. content/locale filtering (non-Latin names, denylisted keywords)
//! 3. override patching (exact name, then case-insensitive fallback)
//! 4. suppression rules (attached as feature overrides)
//! 5. low-signal cleanup, skipping whitelisted display names
//! 6. uniqueness guard over canonical keys (and so display names)
//!
//! Feature-level corrections are only attached here; feature synthesis
//! applies them so era exclusivity is enforced in a single place.

mod filters;
mod table;

pub use filters::{denylist_hit, has_non_latin};
pub use table::{CurationTable, ManualRecord, OverrideEntry, SuppressionRule};

use crate::normalize::canonical_key;
use crate::record::{FeatureOverrides, FusedRecord, RecordOrigin, StorePresence, TaxonomyText};
use gamecat_common::config::PipelineParams;
use gamecat_common::diagnostics::CurationStats;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Unmatched override titles get a suggestion at or above this similarity
const SUGGESTION_THRESHOLD: f64 = 0.8;

pub fn curate(
    records: Vec<FusedRecord>,
    table: &CurationTable,
    params: &PipelineParams,
) -> (Vec<FusedRecord>, CurationStats) {
    let mut stats = CurationStats::default();

    let records = insert_manual(records, &table.manual, &mut stats);
    let records = filter_content(records, &table.denylist, &mut stats);
    let (records, matched_names) = apply_overrides(records, &table.overrides, &mut stats);
    let records = attach_suppressions(records, table, &mut stats);

    let records = if params.low_signal_cleanup {
        let mut whitelist = table.whitelist();
        whitelist.extend(matched_names);
        cleanup_low_signal(records, &whitelist, &mut stats)
    } else {
        records
    };

    let mut seen = HashSet::new();
    let records: Vec<FusedRecord> = records
        .into_iter()
        .filter(|r| {
            let unique = seen.insert(r.key.clone());
            if !unique {
                stats.duplicate_names_dropped += 1;
                debug!("Dropping duplicate display name '{}'", r.name);
            }
            unique
        })
        .collect();

    stats.output_records = records.len();
    info!("Curated {}", stats.display_string());
    (records, stats)
}

fn insert_manual(
    mut records: Vec<FusedRecord>,
    manual: &[ManualRecord],
    stats: &mut CurationStats,
) -> Vec<FusedRecord> {
    for entry in manual {
        let before = records.len();
        let key = canonical_key(&entry.name);
        records.retain(|r| r.key != key);
        if records.len() < before {
            stats.manual_replaced += 1;
            debug!("Manual record replaces automated '{}'", entry.name);
        }
        records.push(manual_record(entry));
        stats.manual_inserted += 1;
    }
    records
}

fn manual_record(entry: &ManualRecord) -> FusedRecord {
    FusedRecord {
        key: canonical_key(&entry.name),
        name: entry.name.clone(),
        price: entry.price,
        release_year: entry.release_year,
        platforms: entry.platforms,
        stores: StorePresence {
            on_steam: entry.on_steam,
            on_epic: entry.on_epic,
        },
        reviews: entry.reviews,
        quality_score: entry.quality_score,
        header_image: entry.header_image.clone(),
        taxonomy: TaxonomyText {
            genres: entry.genres.clone(),
            tags: entry.tags.clone(),
            categories: entry.categories.clone(),
            developers: entry.developers.clone(),
            publishers: entry.publishers.clone(),
            languages: entry.languages.clone(),
        },
        origin: RecordOrigin::Manual,
        overrides: FeatureOverrides::default(),
    }
}

fn filter_content(
    records: Vec<FusedRecord>,
    denylist: &[String],
    stats: &mut CurationStats,
) -> Vec<FusedRecord> {
    records
        .into_iter()
        .filter(|r| {
            if has_non_latin(&r.name) {
                stats.dropped_non_latin += 1;
                return false;
            }
            if let Some(keyword) = denylist_hit(r, denylist) {
                debug!("Dropping '{}' (denylisted keyword '{}')", r.name, keyword);
                stats.dropped_denylist += 1;
                return false;
            }
            true
        })
        .collect()
}

/// Patch named titles; returns the display names that were actually patched
fn apply_overrides(
    mut records: Vec<FusedRecord>,
    overrides: &[OverrideEntry],
    stats: &mut CurationStats,
) -> (Vec<FusedRecord>, Vec<String>) {
    let mut matched_names = Vec::new();
    for entry in overrides {
        let position = records
            .iter()
            .position(|r| r.name == entry.name)
            .or_else(|| {
                let wanted = entry.name.to_lowercase();
                records.iter().position(|r| r.name.to_lowercase() == wanted)
            });

        let Some(index) = position else {
            match closest_name(&records, &entry.name) {
                Some(suggestion) => warn!(
                    "Override '{}' matched no record (closest: '{}')",
                    entry.name, suggestion
                ),
                None => warn!("Override '{}' matched no record", entry.name),
            }
            stats.overrides_unmatched.push(entry.name.clone());
            continue;
        };

        let record = &mut records[index];
        if let Some(reviews) = entry.reviews {
            record.reviews = reviews;
        }
        if let Some(image) = &entry.header_image {
            record.header_image = Some(image.clone());
        }
        if let Some(platforms) = entry.platforms {
            record.platforms = platforms;
        }
        record.overrides.set.extend(entry.set.iter().cloned());
        record.overrides.clear.extend(entry.clear.iter().cloned());
        if entry.era.is_some() {
            record.overrides.era = entry.era;
        }
        matched_names.push(record.name.clone());
        stats.overrides_applied += 1;
    }
    (records, matched_names)
}

fn closest_name<'a>(records: &'a [FusedRecord], name: &str) -> Option<&'a str> {
    let wanted = name.to_lowercase();
    records
        .iter()
        .map(|r| (r.name.as_str(), strsim::normalized_levenshtein(&wanted, &r.name.to_lowercase())))
        .filter(|(_, similarity)| *similarity >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
}

fn attach_suppressions(
    mut records: Vec<FusedRecord>,
    table: &CurationTable,
    stats: &mut CurationStats,
) -> Vec<FusedRecord> {
    for rule in &table.suppressions {
        let pattern = rule.name_contains.to_lowercase();
        for record in records
            .iter_mut()
            .filter(|r| r.name.to_lowercase().contains(&pattern))
        {
            record.overrides.clear.extend(rule.clear.iter().cloned());
            stats.suppressions_attached += 1;
        }
    }
    records
}

/// Drop records present only in the low-signal source unless whitelisted
fn cleanup_low_signal(
    records: Vec<FusedRecord>,
    whitelist: &HashSet<String>,
    stats: &mut CurationStats,
) -> Vec<FusedRecord> {
    records
        .into_iter()
        .filter(|r| {
            if !r.stores.is_epic_only() {
                return true;
            }
            if whitelist.contains(&r.name) {
                stats.cleanup_protected += 1;
                return true;
            }
            stats.cleanup_dropped += 1;
            false
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PlatformFlags;

    fn record(name: &str, on_steam: bool, on_epic: bool) -> FusedRecord {
        FusedRecord {
            key: canonical_key(name),
            name: name.to_string(),
            price: 0.0,
            release_year: 2015,
            platforms: PlatformFlags::default(),
            stores: StorePresence { on_steam, on_epic },
            reviews: 0,
            quality_score: 0.0,
            header_image: None,
            taxonomy: TaxonomyText::default(),
            origin: RecordOrigin::Fused,
            overrides: FeatureOverrides::default(),
        }
    }

    fn table() -> CurationTable {
        CurationTable::parse(
            r#"
            version = 1
            denylist = ["nsfw"]
            protected = ["Protected Exclusive"]

            [[manual]]
            name = "Hand Made"
            release_year = 2011
            reviews = 5000

            [[override]]
            name = "fortnite"
            reviews = 1000000
            set = ["gen_shooter"]
            era = "recent"

            [[override]]
            name = "Nowhere Game"

            [[suppression]]
            name_contains = "football"
            clear = ["gen_sports"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_curation_pass() {
        let mut nsfw = record("Spicy Game", true, false);
        nsfw.taxonomy.genres = Some("Casual, NSFW".to_string());
        let records = vec![
            record("Fortnite", false, true),
            record("Epic Only Filler", false, true),
            record("Protected Exclusive", false, true),
            record("Both Stores", true, true),
            record("Hand Made", true, false),
            record("東方プロジェクト", true, false),
            record("Super Football 2020", true, false),
            nsfw,
        ];

        let (records, stats) = curate(records, &table(), &PipelineParams::default());
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();

        assert!(names.contains(&"Fortnite"));
        assert!(names.contains(&"Protected Exclusive"));
        assert!(names.contains(&"Both Stores"));
        assert!(!names.contains(&"Epic Only Filler"));
        assert!(!names.contains(&"Spicy Game"));
        assert_eq!(names.iter().filter(|n| **n == "Hand Made").count(), 1);

        let fortnite = records.iter().find(|r| r.name == "Fortnite").unwrap();
        assert_eq!(fortnite.reviews, 1_000_000);
        assert!(fortnite.overrides.set.contains("gen_shooter"));
        assert_eq!(fortnite.overrides.era, Some(crate::record::Era::Recent));

        let hand_made = records.iter().find(|r| r.name == "Hand Made").unwrap();
        assert_eq!(hand_made.origin, RecordOrigin::Manual);

        let football = records.iter().find(|r| r.name == "Super Football 2020").unwrap();
        assert!(football.overrides.clear.contains("gen_sports"));

        assert_eq!(stats.manual_replaced, 1);
        assert_eq!(stats.dropped_non_latin, 1);
        assert_eq!(stats.dropped_denylist, 1);
        assert_eq!(stats.overrides_applied, 1);
        assert_eq!(stats.overrides_unmatched, vec!["Nowhere Game".to_string()]);
        assert_eq!(stats.cleanup_dropped, 1);
        assert_eq!(stats.cleanup_protected, 2);
    }

    #[test]
    fn test_mature_tag_alone_does_not_filter() {
        let mut gta = record("Grand Theft Auto V", true, false);
        gta.taxonomy.genres = Some("Action, Adventure".to_string());
        gta.taxonomy.tags = Some("Open World, Mature, Crime".to_string());

        let table = CurationTable::embedded().unwrap();
        let (records, stats) = curate(vec![gta], &table, &PipelineParams::default());

        assert!(records.iter().any(|r| r.name == "Grand Theft Auto V"));
        assert_eq!(stats.dropped_denylist, 0);
    }

    #[test]
    fn test_mature_genre_still_filters() {
        let mut adult = record("Night Club", true, false);
        adult.taxonomy.genres = Some("Casual, Mature".to_string());

        let table = CurationTable::embedded().unwrap();
        let (records, stats) = curate(vec![adult], &table, &PipelineParams::default());

        assert!(records.iter().all(|r| r.name != "Night Club"));
        assert_eq!(stats.dropped_denylist, 1);
    }

    #[test]
    fn test_manual_record_replaces_differently_cased_row() {
        let automated = record("HAND MADE", true, false);
        let (records, stats) = curate(vec![automated], &table(), &PipelineParams::default());

        let matching: Vec<&FusedRecord> = records
            .iter()
            .filter(|r| r.key == canonical_key("Hand Made"))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, "Hand Made");
        assert_eq!(matching[0].origin, RecordOrigin::Manual);
        assert_eq!(stats.manual_replaced, 1);
    }

    #[test]
    fn test_cleanup_disabled_keeps_low_signal_records() {
        let params = PipelineParams {
            low_signal_cleanup: false,
            ..Default::default()
        };
        let (records, stats) = curate(
            vec![record("Epic Only Filler", false, true)],
            &CurationTable::default(),
            &params,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(stats.cleanup_dropped, 0);
    }

    #[test]
    fn test_curation_is_idempotent() {
        let input = vec![record("Fortnite", false, true), record("Both Stores", true, true)];
        let (once, _) = curate(input, &table(), &PipelineParams::default());
        let (twice, _) = curate(once.clone(), &table(), &PipelineParams::default());
        assert_eq!(once, twice);
    }
}

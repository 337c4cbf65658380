// Feature synthesis
//
// Compiles free-text taxonomy into the multi-hot vector, buckets the release
// year into exactly one era and rescales popularity. Curation overrides are
// applied after keyword derivation: derived -> set -> clear.

use super::taxonomy::{EraThresholds, TaxonomyTable};
use crate::record::{FusedGameRecord, FusedRecord, TaxonomyText};
use gamecat_common::diagnostics::SynthesisStats;
use gamecat_common::layout::FeatureFamily;
use gamecat_common::{FeatureLayout, Result};
use tracing::{debug, info, warn};

/// Keyword column compiled against its family's text blob
#[derive(Debug, Clone)]
struct CompiledColumn {
    name: String,
    family: FeatureFamily,
    keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FeatureSynthesizer {
    layout: FeatureLayout,
    columns: Vec<CompiledColumn>,
    era: EraThresholds,
}

impl FeatureSynthesizer {
    pub fn new(taxonomy: &TaxonomyTable) -> Result<Self> {
        let layout = taxonomy.layout()?;
        let columns = taxonomy
            .keyword_columns()
            .map(|(family, entry)| CompiledColumn {
                name: entry.column.clone(),
                family,
                keywords: entry
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Ok(Self {
            layout,
            columns,
            era: taxonomy.era,
        })
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Keyword-derived flags for one record, in layout order
    pub fn derive_flags(&self, taxonomy: &TaxonomyText) -> Vec<bool> {
        let blobs = TextBlobs::from(taxonomy);
        self.columns
            .iter()
            .map(|column| {
                let blob = blobs.for_family(column.family);
                column.keywords.iter().any(|k| blob.contains(k.as_str()))
            })
            .collect()
    }

    /// Build feature-enriched records from the curated table
    ///
    /// Popularity is min-max scaled over exactly this record set, so it must
    /// be recomputed whenever the set changes.
    pub fn synthesize(&self, records: Vec<FusedRecord>) -> (Vec<FusedGameRecord>, SynthesisStats) {
        let mut stats = SynthesisStats {
            records: records.len(),
            dimension: self.layout.dimension(),
            layout_version: self.layout.version(),
            layout_fingerprint: self.layout.fingerprint().to_string(),
            ..Default::default()
        };

        let reviews: Vec<u64> = records.iter().map(|r| r.reviews).collect();
        let normalized = normalize_popularity(&reviews);

        let output: Vec<FusedGameRecord> = records
            .into_iter()
            .zip(normalized)
            .map(|(record, norm_reviews)| {
                let mut flags = self.derive_flags(&record.taxonomy);
                let overrides = &record.overrides;

                for column in &overrides.set {
                    if let Some(index) = self.flag_index(column) {
                        flags[index] = true;
                        stats.flag_overrides_applied += 1;
                    } else {
                        warn!("Override column '{}' is not a feature column", column);
                    }
                }
                for column in &overrides.clear {
                    if let Some(index) = self.flag_index(column) {
                        flags[index] = false;
                        stats.suppressions_applied += 1;
                    }
                }

                let era = match overrides.era {
                    Some(era) => {
                        stats.era_overrides_applied += 1;
                        era
                    }
                    None => self.era.era_for_year(record.release_year),
                };
                stats.era_counts[era.index()] += 1;
                if !flags.iter().any(|&f| f) {
                    stats.empty_feature_rows += 1;
                    debug!("'{}' matched no taxonomy keyword", record.name);
                }

                FusedGameRecord {
                    name: record.name,
                    price: record.price,
                    release_year: record.release_year,
                    platforms: record.platforms,
                    stores: record.stores,
                    reviews: record.reviews,
                    quality_score: record.quality_score,
                    header_image: record.header_image,
                    era,
                    flags,
                    norm_reviews,
                    cluster: None,
                    projection: None,
                }
            })
            .collect();

        info!("Synthesized {}", stats.display_string());
        (output, stats)
    }

    fn flag_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

/// Lower-cased text blob per feature family
struct TextBlobs {
    genre: String,
    category: String,
    developer: String,
    language: String,
}

impl From<&TaxonomyText> for TextBlobs {
    fn from(text: &TaxonomyText) -> Self {
        let join = |parts: &[&Option<String>]| {
            parts
                .iter()
                .filter_map(|p| p.as_deref())
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        };
        Self {
            genre: join(&[&text.genres, &text.tags, &text.categories]),
            category: join(&[&text.categories]),
            developer: join(&[&text.developers, &text.publishers]),
            language: join(&[&text.languages]),
        }
    }
}

impl TextBlobs {
    fn for_family(&self, family: FeatureFamily) -> &str {
        match family {
            FeatureFamily::Genre => &self.genre,
            FeatureFamily::Category => &self.category,
            FeatureFamily::Developer => &self.developer,
            FeatureFamily::Language => &self.language,
            FeatureFamily::Era | FeatureFamily::Popularity => "",
        }
    }
}

/// `log(1 + x)` followed by min-max scaling over the whole set
///
/// A constant column (including a single record) maps to 0 everywhere.
pub fn normalize_popularity(reviews: &[u64]) -> Vec<f64> {
    let logged: Vec<f64> = reviews.iter().map(|&r| (r as f64).ln_1p()).collect();
    let min = logged.iter().copied().fold(f64::INFINITY, f64::min);
    let max = logged.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return vec![0.0; logged.len()];
    }
    logged.iter().map(|v| (v - min) / span).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::canonical_key;
    use crate::record::{Era, FeatureOverrides, PlatformFlags, RecordOrigin, StorePresence};

    fn synthesizer() -> FeatureSynthesizer {
        FeatureSynthesizer::new(&TaxonomyTable::embedded().unwrap()).unwrap()
    }

    fn record(name: &str, genres: &str, year: i32, reviews: u64) -> FusedRecord {
        FusedRecord {
            key: canonical_key(name),
            name: name.to_string(),
            price: 0.0,
            release_year: year,
            platforms: PlatformFlags::default(),
            stores: StorePresence {
                on_steam: true,
                on_epic: false,
            },
            reviews,
            quality_score: 0.0,
            header_image: None,
            taxonomy: TaxonomyText {
                genres: Some(genres.to_string()),
                ..Default::default()
            },
            origin: RecordOrigin::Fused,
            overrides: FeatureOverrides::default(),
        }
    }

    fn flag(s: &FeatureSynthesizer, record: &FusedGameRecord, column: &str) -> bool {
        record.feature_vector()[s.layout().index_of(column).unwrap()] == 1.0
    }

    #[test]
    fn test_overlapping_keyword_sets() {
        let s = synthesizer();
        let (records, _) = s.synthesize(vec![record("Crafty", "open world survival craft", 2016, 10)]);
        let r = &records[0];
        assert!(flag(&s, r, "gen_open_world"));
        assert!(flag(&s, r, "gen_survival"));
        assert!(flag(&s, r, "gen_sandbox"));
        assert!(!flag(&s, r, "gen_action"));
    }

    #[test]
    fn test_family_blobs_are_separate() {
        let s = synthesizer();
        let mut input = record("Studio Game", "Action", 2016, 10);
        input.taxonomy.categories = Some("Single-player, Online Co-op".to_string());
        input.taxonomy.developers = Some("Valve".to_string());
        input.taxonomy.languages = Some("English, Turkish".to_string());
        let flags = s.derive_flags(&input.taxonomy);
        let get = |c: &str| flags[s.layout().index_of(c).unwrap()];

        assert!(get("cat_single_player"));
        assert!(get("cat_online_coop"));
        assert!(get("cat_coop"));
        assert!(get("dev_valve"));
        assert!(get("lang_turkish"));
        assert!(!get("cat_multiplayer"));
    }

    #[test]
    fn test_era_override_keeps_exclusivity() {
        let s = synthesizer();
        let mut input = record("Old Looking", "Action", 2005, 10);
        input.overrides.era = Some(Era::Recent);
        let (records, stats) = s.synthesize(vec![input, record("Plain", "Action", 2015, 5)]);

        assert_eq!(records[0].era_flags(), [false, false, true]);
        assert_eq!(records[1].era, Era::MidEra);
        assert_eq!(stats.era_overrides_applied, 1);
        for r in &records {
            assert_eq!(r.era_flags().iter().filter(|&&f| f).count(), 1);
        }
    }

    #[test]
    fn test_clear_wins_over_set() {
        let s = synthesizer();
        let mut input = record("Football Game", "Sports, Action", 2016, 10);
        input.overrides.set.insert("gen_racing".to_string());
        input.overrides.clear.insert("gen_action".to_string());
        input.overrides.set.insert("gen_action".to_string());
        let (records, _) = s.synthesize(vec![input]);
        assert!(flag(&s, &records[0], "gen_sports"));
        assert!(flag(&s, &records[0], "gen_racing"));
        assert!(!flag(&s, &records[0], "gen_action"));
    }

    #[test]
    fn test_popularity_normalization_range() {
        let values = normalize_popularity(&[0, 10, 1000, 50]);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
        assert!(values[1] < values[3]);

        assert_eq!(normalize_popularity(&[7, 7, 7]), vec![0.0, 0.0, 0.0]);
        assert!(normalize_popularity(&[]).is_empty());
    }

    #[test]
    fn test_vector_dimension_matches_layout() {
        let s = synthesizer();
        let (records, stats) = s.synthesize(vec![
            record("A", "Action", 2001, 1),
            record("B", "", 2022, 100),
        ]);
        for r in &records {
            assert_eq!(r.feature_vector().len(), s.layout().dimension());
        }
        assert_eq!(stats.empty_feature_rows, 1);
    }
}

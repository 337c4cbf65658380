//! Run diagnostics
//!
//! Recoverable conditions (junk, duplicates, unparsable dates, defaulted
//! fields, unmatched curation entries) never abort a run. They are counted
//! here per stage so data-quality drift stays observable, and the whole
//! struct is persisted next to the other snapshot artifacts.

use serde::{Deserialize, Serialize};

/// Source preprocessing statistics (one per source)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessStats {
    pub source: String,
    pub input_records: usize,
    pub dropped_missing_name: usize,
    pub dropped_junk: usize,
    pub dropped_unkeyable: usize,
    pub dropped_below_floor: usize,
    pub dropped_duplicates: usize,
    pub unparsable_dates: usize,
    pub unparsable_prices: usize,
    /// Optional columns absent from the table (defaults substituted)
    pub missing_optional_columns: Vec<String>,
    /// Columns present in the table but irrelevant to modeling
    pub dropped_columns: Vec<String>,
    pub output_records: usize,
}

impl PreprocessStats {
    pub fn display_string(&self) -> String {
        format!(
            "{}: {} in, {} out ({} junk, {} below floor, {} duplicates, {} unparsable dates)",
            self.source,
            self.input_records,
            self.output_records,
            self.dropped_junk,
            self.dropped_below_floor,
            self.dropped_duplicates,
            self.unparsable_dates
        )
    }
}

/// Fusion engine statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionStats {
    pub matched: usize,
    pub primary_only: usize,
    pub secondary_only: usize,
    pub conflicts: usize,
    pub imputed_years: usize,
    pub defaulted_prices: usize,
    pub defaulted_platforms: usize,
    pub defaulted_popularity: usize,
    pub output_records: usize,
}

impl FusionStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} fused ({} matched, {} primary-only, {} secondary-only), {} conflicts, {} years imputed",
            self.output_records,
            self.matched,
            self.primary_only,
            self.secondary_only,
            self.conflicts,
            self.imputed_years
        )
    }
}

/// Curation layer statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurationStats {
    pub manual_inserted: usize,
    pub manual_replaced: usize,
    pub dropped_non_latin: usize,
    pub dropped_denylist: usize,
    pub overrides_applied: usize,
    /// Override titles that matched no record
    pub overrides_unmatched: Vec<String>,
    pub suppressions_attached: usize,
    pub cleanup_dropped: usize,
    pub cleanup_protected: usize,
    pub duplicate_names_dropped: usize,
    pub output_records: usize,
}

impl CurationStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} curated ({} manual, {} non-latin, {} denylisted, {} overrides, {} unmatched, {} cleaned up, {} protected)",
            self.output_records,
            self.manual_inserted,
            self.dropped_non_latin,
            self.dropped_denylist,
            self.overrides_applied,
            self.overrides_unmatched.len(),
            self.cleanup_dropped,
            self.cleanup_protected
        )
    }
}

/// Feature synthesis statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisStats {
    pub records: usize,
    pub dimension: usize,
    pub layout_version: u32,
    pub layout_fingerprint: String,
    pub flag_overrides_applied: usize,
    pub era_overrides_applied: usize,
    pub suppressions_applied: usize,
    pub era_counts: [usize; 3],
    /// Records with no taxonomy flag set at all
    pub empty_feature_rows: usize,
}

impl SynthesisStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} records x {} features (layout v{}), eras retro/mid/recent = {}/{}/{}, {} empty rows",
            self.records,
            self.dimension,
            self.layout_version,
            self.era_counts[0],
            self.era_counts[1],
            self.era_counts[2],
            self.empty_feature_rows
        )
    }
}

/// Clustering and retrieval statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStats {
    pub clusters: usize,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Cohesion score; `None` when fewer than two clusters were populated
    pub silhouette: Option<f64>,
    pub silhouette_sample: usize,
    pub explained_variance_ratio: [f64; 2],
    pub indexed_vectors: usize,
}

impl ModelStats {
    pub fn display_string(&self) -> String {
        let silhouette = self
            .silhouette
            .map(|s| format!("{:.4}", s))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "k={} inertia={:.3} iterations={} silhouette={} (sample {}), {} vectors indexed",
            self.clusters,
            self.inertia,
            self.iterations,
            silhouette,
            self.silhouette_sample,
            self.indexed_vectors
        )
    }
}

/// Diagnostics for one full pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub preprocess: Vec<PreprocessStats>,
    pub fusion: FusionStats,
    pub curation: CurationStats,
    pub synthesis: SynthesisStats,
    pub model: Option<ModelStats>,
}

impl RunDiagnostics {
    /// Total records dropped for any recoverable reason before feature synthesis
    pub fn total_dropped(&self) -> usize {
        let preprocess: usize = self
            .preprocess
            .iter()
            .map(|p| {
                p.dropped_missing_name
                    + p.dropped_junk
                    + p.dropped_unkeyable
                    + p.dropped_below_floor
                    + p.dropped_duplicates
            })
            .sum();
        preprocess
            + self.curation.dropped_non_latin
            + self.curation.dropped_denylist
            + self.curation.cleanup_dropped
            + self.curation.duplicate_names_dropped
    }
}

// Cross-source conflict reporting
//
// Fusion always resolves a field by source priority; conflicts are recorded
// only so disagreements between catalogs stay visible in diagnostics.

use crate::normalize::CanonicalKey;
use serde::{Deserialize, Serialize};

/// Name similarity at or above this is a spelling variant, not a conflict
const NAME_VARIANT_THRESHOLD: f64 = 0.85;

/// Price differences below this are rounding noise
const PRICE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    /// Values differ but plausibly describe the same product
    Low,
    /// Values differ enough to suspect a false key collision
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub key: CanonicalKey,
    pub field: String,
    /// Value kept (higher-priority source)
    pub kept: String,
    /// Value discarded
    pub discarded: String,
    /// Normalized Levenshtein similarity (text fields only)
    pub similarity: Option<f64>,
    pub severity: ConflictSeverity,
}

/// Compare two display names that collapsed onto the same key
pub fn check_names(key: &CanonicalKey, kept: &str, discarded: &str) -> Option<ConflictReport> {
    if kept == discarded {
        return None;
    }
    let similarity = strsim::normalized_levenshtein(&kept.to_lowercase(), &discarded.to_lowercase());
    let severity = if similarity >= NAME_VARIANT_THRESHOLD {
        ConflictSeverity::Low
    } else {
        ConflictSeverity::High
    };
    let mut conflict = report(key, "name", kept, discarded, severity);
    conflict.similarity = Some(similarity);
    Some(conflict)
}

pub fn check_price(key: &CanonicalKey, kept: Option<f64>, discarded: Option<f64>) -> Option<ConflictReport> {
    let (kept, discarded) = (kept?, discarded?);
    if (kept - discarded).abs() < PRICE_TOLERANCE {
        return None;
    }
    Some(report(
        key,
        "price",
        &format!("{:.2}", kept),
        &format!("{:.2}", discarded),
        ConflictSeverity::Low,
    ))
}

pub fn check_year(key: &CanonicalKey, kept: Option<i32>, discarded: Option<i32>) -> Option<ConflictReport> {
    let (kept, discarded) = (kept?, discarded?);
    if kept == discarded {
        return None;
    }
    // Re-releases shift by a year or two; more than that suggests different products
    let severity = if (kept - discarded).abs() > 2 {
        ConflictSeverity::High
    } else {
        ConflictSeverity::Low
    };
    Some(report(
        key,
        "release_year",
        &kept.to_string(),
        &discarded.to_string(),
        severity,
    ))
}

fn report(
    key: &CanonicalKey,
    field: &str,
    kept: &str,
    discarded: &str,
    severity: ConflictSeverity,
) -> ConflictReport {
    ConflictReport {
        key: key.clone(),
        field: field.to_string(),
        kept: kept.to_string(),
        discarded: discarded.to_string(),
        similarity: None,
        severity,
    }
}

// Popularity classifier input
//
// The classifier itself lives outside this crate. It consumes the shared
// feature layout minus the popularity family, with a binary hit label.

use crate::record::FusedGameRecord;
use gamecat_common::{Error, FeatureLayout, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierDataset {
    pub layout_fingerprint: String,
    /// Feature column names, in layout order
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    /// `true` when the popularity count is strictly above `threshold`
    pub is_hit: Vec<bool>,
    pub threshold: f64,
}

impl ClassifierDataset {
    pub fn hit_count(&self) -> usize {
        self.is_hit.iter().filter(|&&h| h).count()
    }
}

/// Build the classifier table; `quantile` in (0, 1) picks the hit threshold
pub fn classifier_dataset(
    records: &[FusedGameRecord],
    layout: &FeatureLayout,
    quantile: f64,
) -> Result<ClassifierDataset> {
    if !(quantile > 0.0 && quantile < 1.0) {
        return Err(Error::InvalidInput(format!(
            "hit quantile must be in (0, 1), got {}",
            quantile
        )));
    }

    let indices = layout.classifier_columns();
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let vector = record.feature_vector();
        layout.ensure_dimension(vector.len())?;
        rows.push(indices.iter().map(|&i| vector[i]).collect());
    }

    let mut counts: Vec<f64> = records.iter().map(|r| r.reviews as f64).collect();
    counts.sort_by(|a, b| a.total_cmp(b));
    let threshold = quantile_of_sorted(&counts, quantile);

    Ok(ClassifierDataset {
        layout_fingerprint: layout.fingerprint().to_string(),
        columns: indices
            .iter()
            .map(|&i| layout.columns()[i].name.clone())
            .collect(),
        rows,
        is_hit: records.iter().map(|r| r.reviews as f64 > threshold).collect(),
        threshold,
    })
}

/// Linear interpolation between closest ranks
fn quantile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let position = q * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolation() {
        assert_eq!(quantile_of_sorted(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile_of_sorted(&[1.0, 2.0, 3.0], 0.5), 2.0);
        assert_eq!(quantile_of_sorted(&[5.0], 0.75), 5.0);
        assert_eq!(quantile_of_sorted(&[], 0.5), 0.0);
    }
}

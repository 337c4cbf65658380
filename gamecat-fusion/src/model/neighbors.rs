// Exact cosine nearest-neighbor index
//
// Exhaustive scan over every indexed vector. Rows are in fused-table order,
// so a neighbor's row is also its record index.

use gamecat_common::{Error, FeatureLayout, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborIndex {
    pub layout_fingerprint: String,
    pub metric: DistanceMetric,
    /// K configured at build time (including the query's own row)
    pub default_k: usize,
    dimension: usize,
    vectors: Vec<Vec<f64>>,
    #[serde(skip)]
    norms: Vec<f64>,
}

impl NeighborIndex {
    pub fn build(vectors: Vec<Vec<f64>>, layout: &FeatureLayout, default_k: usize) -> Result<Self> {
        for vector in &vectors {
            layout.ensure_dimension(vector.len())?;
        }
        let norms = vectors.iter().map(|v| norm(v)).collect();
        Ok(Self {
            layout_fingerprint: layout.fingerprint().to_string(),
            metric: DistanceMetric::Cosine,
            default_k,
            dimension: layout.dimension(),
            vectors,
            norms,
        })
    }

    /// Restore cached norms after deserialization and check the layout
    pub fn restore(mut self, layout: &FeatureLayout) -> Result<Self> {
        layout.ensure_compatible(&self.layout_fingerprint, "neighbor index")?;
        layout.ensure_dimension(self.dimension)?;
        if self.vectors.iter().any(|v| v.len() != self.dimension) {
            return Err(Error::LayoutMismatch(
                "neighbor index holds vectors of inconsistent width".to_string(),
            ));
        }
        self.norms = self.vectors.iter().map(|v| norm(v)).collect();
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn vector(&self, row: usize) -> Option<&[f64]> {
        self.vectors.get(row).map(Vec::as_slice)
    }

    /// The `k` nearest rows by cosine distance, ascending (ties by row)
    ///
    /// A vector that is itself indexed comes back first at distance 0; callers
    /// exclude it themselves.
    pub fn query(&self, vector: &[f64], k: usize) -> Result<Vec<Neighbor>> {
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, vector.len()));
        }
        let query_norm = norm(vector);
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(row, (v, &n))| Neighbor {
                row,
                distance: cosine_distance(vector, query_norm, v, n),
            })
            .collect();

        neighbors.sort_by(|a, b| match a.distance.total_cmp(&b.distance) {
            Ordering::Equal => a.row.cmp(&b.row),
            other => other,
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// `1 - cos(a, b)`, clamped to [0, 2]; 1.0 when either vector is zero
fn cosine_distance(a: &[f64], a_norm: f64, b: &[f64], b_norm: f64) -> f64 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 1.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (1.0 - dot / (a_norm * b_norm)).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecat_common::layout::{FeatureColumn, FeatureFamily};

    fn layout() -> FeatureLayout {
        let col = |name: &str| FeatureColumn {
            name: name.to_string(),
            family: FeatureFamily::Genre,
        };
        FeatureLayout::new(1, vec![col("gen_a"), col("gen_b"), col("gen_c")]).unwrap()
    }

    fn index() -> NeighborIndex {
        NeighborIndex::build(
            vec![
                vec![1.0, 0.0, 0.0],
                vec![1.0, 1.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0],
            ],
            &layout(),
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_self_ranks_first() {
        let index = index();
        let results = index.query(index.vector(1).unwrap(), 3).unwrap();
        assert_eq!(results[0].row, 1);
        assert!(results[0].distance < 1e-12);
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_ties_broken_by_row() {
        let results = index().query(&[0.0, 0.0, 1.0], 5).unwrap();
        assert_eq!(results[0].row, 3);
        // rows 0, 1, 2 are orthogonal and row 4 is the zero vector: all at 1.0
        let tail: Vec<usize> = results[1..].iter().map(|n| n.row).collect();
        assert_eq!(tail, vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        assert!(matches!(
            index().query(&[1.0, 0.0], 3),
            Err(Error::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_restore_after_round_trip() {
        let original = index();
        let json = serde_json::to_string(&original).unwrap();
        let restored: NeighborIndex = serde_json::from_str(&json).unwrap();
        let restored = restored.restore(&layout()).unwrap();
        assert_eq!(
            restored.query(&[1.0, 0.0, 0.0], 2).unwrap(),
            original.query(&[1.0, 0.0, 0.0], 2).unwrap()
        );
    }

    #[test]
    fn test_restore_rejects_width_other_than_layout() {
        let mut narrowed = index();
        narrowed.dimension = 2;
        for vector in &mut narrowed.vectors {
            vector.pop();
        }
        assert!(matches!(
            narrowed.restore(&layout()),
            Err(Error::LayoutMismatch(_))
        ));

        let mut ragged = index();
        ragged.vectors[0].pop();
        assert!(matches!(
            ragged.restore(&layout()),
            Err(Error::LayoutMismatch(_))
        ));
    }
}

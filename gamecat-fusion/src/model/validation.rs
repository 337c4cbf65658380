// Cluster cohesion monitoring
//
// Silhouette coefficient over a seeded random sample. Diagnostic only: the
// pipeline never gates on the score.

use super::kmeans::{squared_distance, ClusterModel};
use gamecat_common::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Mean silhouette of a sample of `vectors`, labelled by `model.predict`
///
/// Returns `None` when the sample covers fewer than two clusters (the score
/// is undefined there).
pub fn sampled_silhouette(
    vectors: &[Vec<f64>],
    model: &ClusterModel,
    sample_size: usize,
    seed: u64,
) -> Result<Option<f64>> {
    let sample = sample_indices(vectors.len(), sample_size, seed);
    let points: Vec<&[f64]> = sample.iter().map(|&i| vectors[i].as_slice()).collect();
    let labels = points
        .iter()
        .map(|p| model.predict(p))
        .collect::<Result<Vec<usize>>>()?;
    Ok(silhouette(&points, &labels))
}

/// Sample indices without replacement (all indices when the set is small)
pub fn sample_indices(len: usize, sample_size: usize, seed: u64) -> Vec<usize> {
    if sample_size >= len {
        return (0..len).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, len, sample_size).into_vec();
    indices.sort_unstable();
    indices
}

/// Silhouette coefficient in [-1, 1]; points alone in their cluster score 0
pub fn silhouette(points: &[&[f64]], labels: &[usize]) -> Option<f64> {
    let k = labels.iter().copied().max()? + 1;
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return None;
    }

    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for (j, other) in points.iter().enumerate() {
            if i != j {
                sums[labels[j]] += squared_distance(point, other).sqrt();
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denominator = a.max(b);
        if denominator > 0.0 {
            total += (b - a) / denominator;
        }
    }
    Some(total / points.len() as f64)
}

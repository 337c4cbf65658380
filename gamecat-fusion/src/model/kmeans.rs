// K-means clustering
//
// k-means++ seeding from a seeded StdRng, Lloyd iterations until the largest
// centroid shift drops below the tolerance, `n_init` restarts keeping the
// lowest inertia. Deterministic for a fixed seed.

use gamecat_common::config::ModelParams;
use gamecat_common::{Error, FeatureLayout, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub clusters: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub n_init: usize,
    pub seed: u64,
}

impl From<&ModelParams> for KMeansConfig {
    fn from(params: &ModelParams) -> Self {
        Self {
            clusters: params.clusters,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
            n_init: params.n_init,
            seed: params.seed,
        }
    }
}

/// Fitted cluster model; persisted so new points can be assigned without refitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterModel {
    pub layout_fingerprint: String,
    pub centroids: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    pub seed: u64,
}

struct Run {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
    converged: bool,
}

impl ClusterModel {
    /// Fit `config.clusters` clusters over `vectors`
    ///
    /// Fails with [`Error::InsufficientRecords`] when there are fewer vectors
    /// than clusters, and with a layout mismatch when a vector has the wrong
    /// width.
    pub fn fit(vectors: &[Vec<f64>], config: &KMeansConfig, layout: &FeatureLayout) -> Result<Self> {
        if config.clusters == 0 {
            return Err(Error::InvalidInput("cluster count must be positive".to_string()));
        }
        if vectors.len() < config.clusters {
            return Err(Error::InsufficientRecords {
                required: config.clusters,
                available: vectors.len(),
            });
        }
        for vector in vectors {
            layout.ensure_dimension(vector.len())?;
        }

        let mut best: Option<Run> = None;
        for attempt in 0..config.n_init.max(1) {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(attempt as u64));
            let run = lloyd(vectors, plus_plus_init(vectors, config.clusters, &mut rng), config);
            debug!(
                "k-means init {}: inertia {:.4} after {} iterations",
                attempt, run.inertia, run.iterations
            );
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let run = best.ok_or_else(|| Error::InvalidInput("k-means produced no run".to_string()))?;
        Ok(Self {
            layout_fingerprint: layout.fingerprint().to_string(),
            centroids: run.centroids,
            labels: run.labels,
            inertia: run.inertia,
            iterations: run.iterations,
            converged: run.converged,
            seed: config.seed,
        })
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn dimension(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    /// Assign a new vector to its nearest centroid
    pub fn predict(&self, vector: &[f64]) -> Result<usize> {
        if vector.len() != self.dimension() {
            return Err(Error::dimension_mismatch(self.dimension(), vector.len()));
        }
        Ok(nearest(&self.centroids, vector).0)
    }

    /// Number of members per cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// k-means++: each next centroid is drawn with probability proportional to
/// its squared distance from the nearest centroid chosen so far
fn plus_plus_init(vectors: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..n)].clone());

    let mut distances: Vec<f64> = vectors
        .iter()
        .map(|v| squared_distance(v, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut index = n - 1;
            for (i, d) in distances.iter().enumerate() {
                if target < *d {
                    index = i;
                    break;
                }
                target -= d;
            }
            index
        } else {
            // Every point coincides with a centroid already
            rng.gen_range(0..n)
        };

        let centroid = vectors[chosen].clone();
        for (d, v) in distances.iter_mut().zip(vectors) {
            *d = d.min(squared_distance(v, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn lloyd(vectors: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, config: &KMeansConfig) -> Run {
    let k = centroids.len();
    let dim = centroids[0].len();
    let mut labels = vec![0usize; vectors.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        for (label, v) in labels.iter_mut().zip(vectors) {
            *label = nearest(&centroids, v).0;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (&label, v) in labels.iter().zip(vectors) {
            counts[label] += 1;
            for (s, x) in sums[label].iter_mut().zip(v) {
                *s += x;
            }
        }

        let mut max_shift: f64 = 0.0;
        for c in 0..k {
            let updated = if counts[c] == 0 {
                // Empty cluster: move it onto the point farthest from its centroid
                farthest_point(vectors, &labels, &centroids)
            } else {
                sums[c].iter().map(|s| s / counts[c] as f64).collect()
            };
            max_shift = max_shift.max(squared_distance(&updated, &centroids[c]).sqrt());
            centroids[c] = updated;
        }

        if max_shift <= config.tolerance {
            converged = true;
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, v) in labels.iter_mut().zip(vectors) {
        let (index, distance) = nearest(&centroids, v);
        *label = index;
        inertia += distance;
    }

    Run {
        centroids,
        labels,
        inertia,
        iterations,
        converged,
    }
}

fn farthest_point(vectors: &[Vec<f64>], labels: &[usize], centroids: &[Vec<f64>]) -> Vec<f64> {
    vectors
        .iter()
        .zip(labels)
        .map(|(v, &l)| (v, squared_distance(v, &centroids[l])))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(v, _)| v.clone())
        .unwrap_or_else(|| centroids[0].clone())
}

/// Index of the nearest centroid (lowest index on ties) and its squared distance
pub(crate) fn nearest(centroids: &[Vec<f64>], vector: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(vector, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

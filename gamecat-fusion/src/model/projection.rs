// 2-D principal component projection (visualization only)
//
// Covariance matrix of the centered vectors, top two eigenvectors by power
// iteration with deflation. Axis signs are fixed so the largest-magnitude
// component is positive, which keeps output stable across runs.

use gamecat_common::{Error, Result};
use serde::{Deserialize, Serialize};

const POWER_ITERATIONS: usize = 1000;
const POWER_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub mean: Vec<f64>,
    pub axes: [Vec<f64>; 2],
    pub explained_variance_ratio: [f64; 2],
}

impl Projection {
    pub fn fit(vectors: &[Vec<f64>]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| Error::InvalidInput("cannot project an empty record set".to_string()))?;
        let dim = first.len();
        let n = vectors.len() as f64;

        let mut mean = vec![0.0; dim];
        for v in vectors {
            for (m, x) in mean.iter_mut().zip(v) {
                *m += x / n;
            }
        }

        let mut covariance = vec![vec![0.0; dim]; dim];
        let denominator = (vectors.len().max(2) - 1) as f64;
        for v in vectors {
            let centered: Vec<f64> = v.iter().zip(&mean).map(|(x, m)| x - m).collect();
            for i in 0..dim {
                if centered[i] == 0.0 {
                    continue;
                }
                for j in i..dim {
                    covariance[i][j] += centered[i] * centered[j] / denominator;
                }
            }
        }
        for i in 0..dim {
            for j in 0..i {
                covariance[i][j] = covariance[j][i];
            }
        }

        let total_variance: f64 = (0..dim).map(|i| covariance[i][i]).sum();
        let (axis_x, lambda_x) = dominant_eigenvector(&covariance);
        deflate(&mut covariance, &axis_x, lambda_x);
        let (axis_y, lambda_y) = dominant_eigenvector(&covariance);

        let ratio = |lambda: f64| {
            if total_variance > 0.0 {
                (lambda / total_variance).max(0.0)
            } else {
                0.0
            }
        };
        Ok(Self {
            mean,
            explained_variance_ratio: [ratio(lambda_x), ratio(lambda_y)],
            axes: [axis_x, axis_y],
        })
    }

    pub fn project(&self, vector: &[f64]) -> [f64; 2] {
        let dot = |axis: &[f64]| -> f64 {
            vector
                .iter()
                .zip(&self.mean)
                .zip(axis)
                .map(|((x, m), a)| (x - m) * a)
                .sum()
        };
        [dot(&self.axes[0]), dot(&self.axes[1])]
    }
}

fn dominant_eigenvector(matrix: &[Vec<f64>]) -> (Vec<f64>, f64) {
    let dim = matrix.len();
    if dim == 0 {
        return (Vec::new(), 0.0);
    }
    // Slightly uneven start so it is not orthogonal to a symmetric eigenvector
    let mut v: Vec<f64> = (0..dim).map(|i| 1.0 + i as f64 * 1e-3).collect();
    normalize(&mut v);

    let mut lambda = 0.0;
    for _ in 0..POWER_ITERATIONS {
        let mut next = multiply(matrix, &v);
        let norm = normalize(&mut next);
        if norm == 0.0 {
            return (vec![0.0; dim], 0.0);
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        lambda = norm;
        if delta < POWER_TOLERANCE {
            break;
        }
    }

    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    (v, lambda)
}

fn deflate(matrix: &mut [Vec<f64>], axis: &[f64], lambda: f64) {
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell -= lambda * axis[i] * axis[j];
        }
    }
}

fn multiply(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

//! Clustering and retrieval
//!
//! All models consume the same feature vectors, in the order fixed by the
//! [`FeatureLayout`], and carry its fingerprint when persisted.

pub mod kmeans;
pub mod neighbors;
pub mod projection;
pub mod validation;

pub use kmeans::{ClusterModel, KMeansConfig};
pub use neighbors::{DistanceMetric, Neighbor, NeighborIndex};
pub use projection::Projection;
pub use validation::sampled_silhouette;

use crate::record::FusedGameRecord;
use gamecat_common::config::ModelParams;
use gamecat_common::diagnostics::ModelStats;
use gamecat_common::{FeatureLayout, Result};
use tracing::info;

/// Every model fitted over one record set
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub cluster_model: ClusterModel,
    pub projection: Projection,
    pub neighbor_index: NeighborIndex,
    pub stats: ModelStats,
}

/// Fit clusters, validate, project and index; labels and projection
/// coordinates are written back onto the records
pub fn fit_models(
    records: &mut [FusedGameRecord],
    layout: &FeatureLayout,
    params: &ModelParams,
) -> Result<ModelArtifacts> {
    let vectors: Vec<Vec<f64>> = records.iter().map(FusedGameRecord::feature_vector).collect();

    let cluster_model = ClusterModel::fit(&vectors, &KMeansConfig::from(params), layout)?;
    info!(
        "Fitted {} clusters (inertia {:.3}, {} iterations, converged: {})",
        cluster_model.k(),
        cluster_model.inertia,
        cluster_model.iterations,
        cluster_model.converged
    );

    let silhouette = sampled_silhouette(&vectors, &cluster_model, params.silhouette_sample, params.seed)?;
    match silhouette {
        Some(score) => info!("Silhouette score: {:.4}", score),
        None => info!("Silhouette score undefined (fewer than two populated clusters)"),
    }

    let projection = Projection::fit(&vectors)?;
    for ((record, vector), &label) in records.iter_mut().zip(&vectors).zip(&cluster_model.labels) {
        record.cluster = Some(label);
        record.projection = Some(projection.project(vector));
    }

    let neighbor_index = NeighborIndex::build(vectors, layout, params.neighbors)?;

    let stats = ModelStats {
        clusters: cluster_model.k(),
        inertia: cluster_model.inertia,
        iterations: cluster_model.iterations,
        converged: cluster_model.converged,
        silhouette,
        silhouette_sample: params.silhouette_sample.min(records.len()),
        explained_variance_ratio: projection.explained_variance_ratio,
        indexed_vectors: neighbor_index.len(),
    };
    info!("Model {}", stats.display_string());

    Ok(ModelArtifacts {
        cluster_model,
        projection,
        neighbor_index,
        stats,
    })
}

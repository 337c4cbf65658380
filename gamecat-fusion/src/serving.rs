//! Serving boundary
//!
//! Resolves a display name to a row, queries the neighbor index with that
//! row's feature vector and renders display fields for each result. A name
//! that matches nothing is a normal outcome ([`Recommendation::NotFound`]).

use crate::features::TaxonomyTable;
use crate::model::NeighborIndex;
use crate::record::FusedGameRecord;
use crate::snapshot::{self, SnapshotDir};
use gamecat_common::layout::FeatureFamily;
use gamecat_common::{Error, FeatureLayout, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Genre labels shown per recommended title
const RESULT_GENRE_LABELS: usize = 3;
/// Genre labels shown for the selected title
const SELECTED_GENRE_LABELS: usize = 4;

/// Display fields for one recommended title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationView {
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub genres: Vec<String>,
    pub platforms: Vec<&'static str>,
    pub stores: Vec<&'static str>,
    pub reviews: u64,
    pub release_year: i32,
    pub distance: f64,
}

/// Display fields for the queried title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedView {
    pub name: String,
    pub image: Option<String>,
    /// Comma-joined genre labels
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Recommendation {
    NotFound {
        query: String,
    },
    Found {
        selected: SelectedView,
        results: Vec<RecommendationView>,
    },
}

/// Resolved fields and active feature columns of one title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    pub name: String,
    pub price: f64,
    pub reviews: u64,
    pub norm_reviews: f64,
    pub release_year: i32,
    pub cluster: Option<usize>,
    pub active_columns: Vec<String>,
}

pub struct Recommender {
    records: Vec<FusedGameRecord>,
    index: NeighborIndex,
    layout: FeatureLayout,
    /// (feature-vector index, label) for every genre column
    genre_labels: Vec<(usize, String)>,
}

impl Recommender {
    pub fn new(
        records: Vec<FusedGameRecord>,
        index: NeighborIndex,
        layout: FeatureLayout,
        taxonomy: &TaxonomyTable,
    ) -> Result<Self> {
        layout.ensure_compatible(&index.layout_fingerprint, "neighbor index")?;
        if index.len() != records.len() {
            return Err(Error::InvalidInput(format!(
                "neighbor index has {} rows but the fused table has {}",
                index.len(),
                records.len()
            )));
        }
        let genre_labels = layout
            .family(FeatureFamily::Genre)
            .map(|(i, column)| (i, taxonomy.label(&column.name)))
            .collect();
        Ok(Self {
            records,
            index,
            layout,
            genre_labels,
        })
    }

    /// Load the recommender from a snapshot directory
    ///
    /// The persisted layout must match the one `taxonomy` defines.
    pub fn open(snapshots: &SnapshotDir, taxonomy: &TaxonomyTable) -> Result<Self> {
        let layout = taxonomy.layout()?;
        let persisted: FeatureLayout = snapshot::read_json(&snapshots.layout())?;
        layout.ensure_compatible(persisted.fingerprint(), "snapshot")?;

        let records = snapshot::load_fused_table(&snapshots.fused_table(), &layout)?;
        let index: NeighborIndex = snapshot::read_json(&snapshots.neighbor_index())?;
        let index = index.restore(&layout)?;
        info!(
            "Loaded {} records and index from {}",
            records.len(),
            snapshots.root().display()
        );
        Self::new(records, index, layout, taxonomy)
    }

    pub fn records(&self) -> &[FusedGameRecord] {
        &self.records
    }

    pub fn default_k(&self) -> usize {
        self.index.default_k
    }

    /// Case-insensitive exact match on display name
    pub fn find(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.records
            .iter()
            .position(|r| r.name.to_lowercase() == wanted)
    }

    /// Query `k` neighbors (self included) and return the other `k - 1`
    pub fn recommend(&self, name: &str, k: usize) -> Result<Recommendation> {
        let Some(row) = self.find(name) else {
            debug!("No title named '{}'", name);
            return Ok(Recommendation::NotFound {
                query: name.to_string(),
            });
        };

        let selected = &self.records[row];
        let vector = selected.feature_vector();
        let neighbors = self.index.query(&vector, k)?;
        let results = neighbors
            .iter()
            .filter(|n| n.row != row)
            .take(k.saturating_sub(1))
            .map(|n| self.render(&self.records[n.row], n.distance))
            .collect();

        Ok(Recommendation::Found {
            selected: SelectedView {
                name: selected.name.clone(),
                image: selected.header_image.clone(),
                description: self.genre_labels(selected, SELECTED_GENRE_LABELS).join(", "),
            },
            results,
        })
    }

    /// Every active feature column of one title
    pub fn feature_report(&self, name: &str) -> Option<FeatureReport> {
        let record = &self.records[self.find(name)?];
        let vector = record.feature_vector();
        let active_columns = self
            .layout
            .columns()
            .iter()
            .zip(&vector)
            .filter(|(column, value)| column.family != FeatureFamily::Popularity && **value == 1.0)
            .map(|(column, _)| column.name.clone())
            .collect();
        Some(FeatureReport {
            name: record.name.clone(),
            price: record.price,
            reviews: record.reviews,
            norm_reviews: record.norm_reviews,
            release_year: record.release_year,
            cluster: record.cluster,
            active_columns,
        })
    }

    fn render(&self, record: &FusedGameRecord, distance: f64) -> RecommendationView {
        RecommendationView {
            name: record.name.clone(),
            image: record.header_image.clone(),
            price: format_price(record.price),
            genres: self.genre_labels(record, RESULT_GENRE_LABELS),
            platforms: record.platforms.labels(),
            stores: record.stores.labels(),
            reviews: record.reviews,
            release_year: record.release_year,
            distance,
        }
    }

    /// Invert the genre columns back into labels, in layout order
    fn genre_labels(&self, record: &FusedGameRecord, limit: usize) -> Vec<String> {
        self.genre_labels
            .iter()
            .filter(|(index, _)| record.flags.get(*index).copied().unwrap_or(false))
            .take(limit)
            .map(|(_, label)| label.clone())
            .collect()
    }
}

pub fn format_price(price: f64) -> String {
    if price == 0.0 {
        "Free".to_string()
    } else {
        format!("${:.2}", price)
    }
}

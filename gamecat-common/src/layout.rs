//! Versioned feature-vector layout
//!
//! The column order defined here is the contract shared by the cluster model,
//! the neighbor index and the popularity classifier. Adding, removing or
//! reordering a column changes the fingerprint and invalidates every model
//! persisted under the previous layout.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Column family; determines which text blob a column is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFamily {
    Genre,
    Category,
    Developer,
    Language,
    Era,
    Popularity,
}

impl FeatureFamily {
    /// Column name prefix conventionally used by the family
    pub fn prefix(&self) -> &'static str {
        match self {
            FeatureFamily::Genre => "gen_",
            FeatureFamily::Category => "cat_",
            FeatureFamily::Developer => "dev_",
            FeatureFamily::Language => "lang_",
            FeatureFamily::Era => "is_",
            FeatureFamily::Popularity => "norm_",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub family: FeatureFamily,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    version: u32,
    columns: Vec<FeatureColumn>,
    fingerprint: String,
}

impl FeatureLayout {
    /// Build a layout, rejecting empty or duplicate column names
    pub fn new(version: u32, columns: Vec<FeatureColumn>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Config("feature layout has no columns".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if column.name.trim().is_empty() {
                return Err(Error::Config("feature column with empty name".to_string()));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate feature column '{}'",
                    column.name
                )));
            }
        }

        let fingerprint = compute_fingerprint(version, &columns);
        Ok(Self {
            version,
            columns,
            fingerprint,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn dimension(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Columns of one family, in layout order
    pub fn family(&self, family: FeatureFamily) -> impl Iterator<Item = (usize, &FeatureColumn)> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.family == family)
    }

    /// Column indices consumed by the popularity classifier
    ///
    /// Popularity-derived columns are excluded so the prediction target does
    /// not leak into its own features.
    pub fn classifier_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.family != FeatureFamily::Popularity)
            .map(|(i, _)| i)
            .collect()
    }

    /// Fail with [`Error::LayoutMismatch`] unless `fingerprint` matches this layout
    pub fn ensure_compatible(&self, fingerprint: &str, artifact: &str) -> Result<()> {
        if self.fingerprint != fingerprint {
            return Err(Error::LayoutMismatch(format!(
                "{} was built for layout {}, current layout is {} (v{})",
                artifact,
                short(fingerprint),
                short(&self.fingerprint),
                self.version
            )));
        }
        Ok(())
    }

    /// Fail with [`Error::LayoutMismatch`] unless `len` equals the layout width
    pub fn ensure_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension() {
            return Err(Error::dimension_mismatch(self.dimension(), len));
        }
        Ok(())
    }
}

fn compute_fingerprint(version: u32, columns: &[FeatureColumn]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_le_bytes());
    for column in columns {
        hasher.update(column.name.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

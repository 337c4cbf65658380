//! Record types flowing through the pipeline
//!
//! Stage ownership: each stage consumes the previous stage's records by value
//! and returns new ones, so nothing is mutated after a later stage read it.
//!
//! - [`SourceRecord`]: one source's preprocessed row (after dedup)
//! - [`FusedRecord`]: fusion/curation output, still carrying free-text taxonomy
//! - [`FusedGameRecord`]: final row with the multi-hot feature vector

use crate::normalize::CanonicalKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Catalog source identity; field priority follows declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Review-rich source, highest field priority
    Steam,
    /// Low-signal source (no popularity metric)
    Epic,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Steam => "steam",
            SourceId::Epic => "epic",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFlags {
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
}

impl Default for PlatformFlags {
    /// Most catalog entries are PC titles: assume Windows-capable only
    fn default() -> Self {
        Self {
            windows: true,
            mac: false,
            linux: false,
        }
    }
}

impl PlatformFlags {
    /// Derive flags from a free-text platform description ("Windows, Mac OS")
    pub fn from_description(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            windows: lower.contains("windows"),
            mac: lower.contains("mac"),
            linux: lower.contains("linux"),
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.windows {
            labels.push("Windows");
        }
        if self.mac {
            labels.push("Mac");
        }
        if self.linux {
            labels.push("Linux");
        }
        labels
    }
}

/// Per-source presence flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePresence {
    pub on_steam: bool,
    pub on_epic: bool,
}

impl StorePresence {
    /// Present only in the low-signal source
    pub fn is_epic_only(&self) -> bool {
        self.on_epic && !self.on_steam
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.on_steam {
            labels.push("Steam");
        }
        if self.on_epic {
            labels.push("Epic");
        }
        labels
    }
}

/// Free-text taxonomy fields; consumed by feature synthesis and then dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyText {
    pub genres: Option<String>,
    pub tags: Option<String>,
    pub categories: Option<String>,
    pub developers: Option<String>,
    pub publishers: Option<String>,
    pub languages: Option<String>,
}

/// Release-period bucket; exactly one per record by construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    Retro,
    MidEra,
    Recent,
}

impl Era {
    pub const ALL: [Era; 3] = [Era::Retro, Era::MidEra, Era::Recent];

    pub fn column(&self) -> &'static str {
        match self {
            Era::Retro => "is_retro",
            Era::MidEra => "is_mid_era",
            Era::Recent => "is_recent",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Era::Retro => 0,
            Era::MidEra => 1,
            Era::Recent => 2,
        }
    }

    /// One-hot `[retro, mid_era, recent]`
    pub fn flags(&self) -> [bool; 3] {
        let mut flags = [false; 3];
        flags[self.index()] = true;
        flags
    }
}

/// Feature corrections attached by curation, applied by feature synthesis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureOverrides {
    /// Columns forced to true
    pub set: BTreeSet<String>,
    /// Columns forced to false (wins over `set`)
    pub clear: BTreeSet<String>,
    /// Era forced regardless of release year
    pub era: Option<Era>,
}

impl FeatureOverrides {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.clear.is_empty() && self.era.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Produced by the fusion engine from source rows
    Fused,
    /// Hand-authored record from the curation table
    Manual,
}

/// One source's row after preprocessing
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub source: SourceId,
    pub key: CanonicalKey,
    pub name: String,
    pub price: Option<f64>,
    pub release_year: Option<i32>,
    pub platforms: Option<PlatformFlags>,
    pub reviews: Option<u64>,
    pub quality_score: Option<f64>,
    pub header_image: Option<String>,
    pub taxonomy: TaxonomyText,
}

/// Fusion / curation output
#[derive(Debug, Clone, PartialEq)]
pub struct FusedRecord {
    pub key: CanonicalKey,
    pub name: String,
    pub price: f64,
    pub release_year: i32,
    pub platforms: PlatformFlags,
    pub stores: StorePresence,
    pub reviews: u64,
    pub quality_score: f64,
    pub header_image: Option<String>,
    pub taxonomy: TaxonomyText,
    pub origin: RecordOrigin,
    pub overrides: FeatureOverrides,
}

/// Final feature-enriched record
///
/// `flags` holds the taxonomy columns (genre, category, developer, language
/// families) in layout order; era and popularity complete the vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedGameRecord {
    pub name: String,
    pub price: f64,
    pub release_year: i32,
    pub platforms: PlatformFlags,
    pub stores: StorePresence,
    pub reviews: u64,
    pub quality_score: f64,
    pub header_image: Option<String>,
    pub era: Era,
    pub flags: Vec<bool>,
    pub norm_reviews: f64,
    pub cluster: Option<usize>,
    pub projection: Option<[f64; 2]>,
}

impl FusedGameRecord {
    /// Numeric projection in layout order: flags, era one-hot, normalized popularity
    pub fn feature_vector(&self) -> Vec<f64> {
        let mut vector = Vec::with_capacity(self.flags.len() + 4);
        vector.extend(self.flags.iter().map(|&f| if f { 1.0 } else { 0.0 }));
        vector.extend(self.era.flags().iter().map(|&f| if f { 1.0 } else { 0.0 }));
        vector.push(self.norm_reviews);
        vector
    }

    pub fn era_flags(&self) -> [bool; 3] {
        self.era.flags()
    }
}

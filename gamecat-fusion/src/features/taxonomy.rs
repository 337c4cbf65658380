// Keyword taxonomy
//
// Versioned data table mapping feature columns to keyword sets, plus the era
// thresholds. The table's column order defines the feature layout.

use crate::record::Era;
use gamecat_common::layout::{FeatureColumn, FeatureFamily, FeatureLayout};
use gamecat_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const EMBEDDED_TAXONOMY: &str = include_str!("../../data/taxonomy.toml");

/// Name of the normalized popularity column (always last in the layout)
pub const POPULARITY_COLUMN: &str = "norm_reviews";

/// Labels rendered upper-case when derived from a column name
const ACRONYMS: [&str; 5] = ["RPG", "FPS", "TPS", "MMO", "MOBA"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordColumn {
    pub column: String,
    pub keywords: Vec<String>,
    /// Display label; derived from the column name when absent
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraThresholds {
    /// Years up to and including this are retro
    pub retro_max: i32,
    /// Years from this on are recent
    pub recent_min: i32,
}

impl EraThresholds {
    pub fn era_for_year(&self, year: i32) -> Era {
        if year <= self.retro_max {
            Era::Retro
        } else if year >= self.recent_min {
            Era::Recent
        } else {
            Era::MidEra
        }
    }
}

impl Default for EraThresholds {
    fn default() -> Self {
        Self {
            retro_max: 2010,
            recent_min: 2020,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyTable {
    pub version: u32,
    #[serde(default)]
    pub era: EraThresholds,
    #[serde(default)]
    pub genre: Vec<KeywordColumn>,
    #[serde(default)]
    pub category: Vec<KeywordColumn>,
    #[serde(default)]
    pub developer: Vec<KeywordColumn>,
    #[serde(default)]
    pub language: Vec<KeywordColumn>,
}

impl TaxonomyTable {
    /// Compiled-in table
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_TAXONOMY)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read taxonomy table {}: {}", path.display(), e))
        })?;
        let table = Self::parse(&text)?;
        info!("Loaded taxonomy v{} from {}", table.version, path.display());
        Ok(table)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let table: Self = toml::from_str(text)
            .map_err(|e| Error::Config(format!("invalid taxonomy table: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.era.retro_max >= self.era.recent_min {
            return Err(Error::Config(format!(
                "era thresholds overlap: retro_max {} >= recent_min {}",
                self.era.retro_max, self.era.recent_min
            )));
        }
        for (family, entry) in self.keyword_columns() {
            if !entry.column.starts_with(family.prefix()) {
                return Err(Error::Config(format!(
                    "taxonomy column '{}' must start with '{}'",
                    entry.column,
                    family.prefix()
                )));
            }
            if entry.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "taxonomy column '{}' has no keywords",
                    entry.column
                )));
            }
        }
        Ok(())
    }

    /// Keyword columns in layout order, tagged with their family
    pub fn keyword_columns(&self) -> impl Iterator<Item = (FeatureFamily, &KeywordColumn)> {
        tagged(FeatureFamily::Genre, &self.genre)
            .chain(tagged(FeatureFamily::Category, &self.category))
            .chain(tagged(FeatureFamily::Developer, &self.developer))
            .chain(tagged(FeatureFamily::Language, &self.language))
    }

    /// Feature layout: keyword columns, era one-hot, normalized popularity
    pub fn layout(&self) -> Result<FeatureLayout> {
        let mut columns: Vec<FeatureColumn> = self
            .keyword_columns()
            .map(|(family, entry)| FeatureColumn {
                name: entry.column.clone(),
                family,
            })
            .collect();
        columns.extend(Era::ALL.iter().map(|era| FeatureColumn {
            name: era.column().to_string(),
            family: FeatureFamily::Era,
        }));
        columns.push(FeatureColumn {
            name: POPULARITY_COLUMN.to_string(),
            family: FeatureFamily::Popularity,
        });
        FeatureLayout::new(self.version, columns)
    }

    /// Human-readable label for a feature column
    pub fn label(&self, column: &str) -> String {
        self.keyword_columns()
            .find(|(_, entry)| entry.column == column)
            .and_then(|(_, entry)| entry.label.clone())
            .unwrap_or_else(|| derive_label(column))
    }
}

fn tagged(
    family: FeatureFamily,
    list: &[KeywordColumn],
) -> impl Iterator<Item = (FeatureFamily, &KeywordColumn)> {
    list.iter().map(move |entry| (family, entry))
}

/// `gen_open_world` -> `Open World`, `gen_rpg` -> `RPG`
pub fn derive_label(column: &str) -> String {
    let stem = column.split_once('_').map(|(_, rest)| rest).unwrap_or(column);
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let upper = word.to_uppercase();
            if ACRONYMS.contains(&upper.as_str()) {
                return upper;
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

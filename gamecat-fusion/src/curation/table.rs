// Curation data table
//
// Hand-authored records, quality overrides, the cleanup whitelist, the
// explicit-content denylist and feature suppression rules. Loaded once at
// startup from TOML; the compiled-in copy is used unless a path is configured.

use crate::normalize::canonical_key;
use crate::record::{Era, PlatformFlags};
use gamecat_common::layout::FeatureFamily;
use gamecat_common::{Error, FeatureLayout, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const EMBEDDED_CURATION: &str = include_str!("../../data/curation.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurationTable {
    pub version: u32,

    /// Explicit-content keywords matched against name + genre text
    #[serde(default)]
    pub denylist: Vec<String>,

    /// Display names immune to the low-signal cleanup (in addition to override titles)
    #[serde(default)]
    pub protected: Vec<String>,

    #[serde(default)]
    pub manual: Vec<ManualRecord>,

    #[serde(default, rename = "override")]
    pub overrides: Vec<OverrideEntry>,

    #[serde(default, rename = "suppression")]
    pub suppressions: Vec<SuppressionRule>,
}

/// Fully specified record inserted without normalization or fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualRecord {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub release_year: i32,
    #[serde(default)]
    pub reviews: u64,
    #[serde(default)]
    pub quality_score: f64,
    #[serde(default)]
    pub header_image: Option<String>,
    #[serde(default)]
    pub platforms: PlatformFlags,
    #[serde(default)]
    pub on_steam: bool,
    #[serde(default)]
    pub on_epic: bool,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub developers: Option<String>,
    #[serde(default)]
    pub publishers: Option<String>,
    #[serde(default)]
    pub languages: Option<String>,
}

/// Ground-truth patch for one named title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub name: String,
    #[serde(default)]
    pub reviews: Option<u64>,
    #[serde(default)]
    pub header_image: Option<String>,
    #[serde(default)]
    pub platforms: Option<PlatformFlags>,
    /// Feature columns forced on
    #[serde(default)]
    pub set: Vec<String>,
    /// Feature columns forced off
    #[serde(default)]
    pub clear: Vec<String>,
    #[serde(default)]
    pub era: Option<Era>,
}

/// Clears feature columns on every record whose name contains a substring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub name_contains: String,
    pub clear: Vec<String>,
}

impl CurationTable {
    /// Compiled-in table
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_CURATION)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read curation table {}: {}", path.display(), e))
        })?;
        let table = Self::parse(&text)?;
        info!("Loaded curation table v{} from {}", table.version, path.display());
        Ok(table)
    }

    /// Configured path if any, else the compiled-in table
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let table: Self = toml::from_str(text)
            .map_err(|e| Error::Config(format!("invalid curation table: {}", e)))?;
        table.check_unique_overrides()?;
        Ok(table)
    }

    /// Override titles are keyed by canonical key; two entries for one title
    /// would make the patch step order-dependent.
    fn check_unique_overrides(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.overrides {
            if !seen.insert(canonical_key(&entry.name)) {
                return Err(Error::Config(format!(
                    "curation table has more than one override for '{}'",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    /// Every column an override or suppression names must be a taxonomy
    /// column of `layout` (era is overridden through `era`, never by column)
    pub fn validate(&self, layout: &FeatureLayout) -> Result<()> {
        let columns = self
            .overrides
            .iter()
            .flat_map(|o| o.set.iter().chain(o.clear.iter()))
            .chain(self.suppressions.iter().flat_map(|s| s.clear.iter()));
        for column in columns {
            let family = layout
                .index_of(column)
                .map(|i| layout.columns()[i].family);
            match family {
                Some(FeatureFamily::Era) | Some(FeatureFamily::Popularity) => {
                    return Err(Error::Config(format!(
                        "curation table cannot override derived column '{}'",
                        column
                    )));
                }
                Some(_) => {}
                None => {
                    return Err(Error::Config(format!(
                        "curation table names unknown feature column '{}'",
                        column
                    )));
                }
            }
        }
        Ok(())
    }

    /// Exact display names immune to the low-signal cleanup
    pub fn whitelist(&self) -> HashSet<String> {
        self.protected
            .iter()
            .chain(self.overrides.iter().map(|o| &o.name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecat_common::layout::FeatureColumn;

    fn layout() -> FeatureLayout {
        let col = |name: &str, family| FeatureColumn {
            name: name.to_string(),
            family,
        };
        FeatureLayout::new(
            1,
            vec![
                col("gen_sports", FeatureFamily::Genre),
                col("is_recent", FeatureFamily::Era),
                col("norm_reviews", FeatureFamily::Popularity),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_embedded_table_parses() {
        let table = CurationTable::embedded().unwrap();
        assert!(table.manual.iter().any(|m| m.name == "Minecraft"));
        assert!(table.denylist.iter().any(|d| d == "nsfw"));
        assert!(table.whitelist().contains("Valorant"));
    }

    #[test]
    fn test_duplicate_override_rejected() {
        let text = r#"
            version = 1
            [[override]]
            name = "Fortnite"
            [[override]]
            name = "FORTNITE™"
        "#;
        assert!(matches!(CurationTable::parse(text), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_and_derived_columns() {
        let mut table = CurationTable::parse("version = 1").unwrap();
        table.suppressions.push(SuppressionRule {
            name_contains: "Football Manager".to_string(),
            clear: vec!["gen_sports".to_string()],
        });
        assert!(table.validate(&layout()).is_ok());

        table.suppressions[0].clear.push("gen_nonexistent".to_string());
        assert!(table.validate(&layout()).is_err());

        table.suppressions[0].clear = vec!["is_recent".to_string()];
        assert!(table.validate(&layout()).is_err());
    }
}

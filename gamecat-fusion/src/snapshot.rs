//! Snapshot artifacts
//!
//! Everything a build produces is written once into one output directory and
//! treated as immutable afterwards:
//!
//! | File | Contents |
//! |---|---|
//! | `fused_table.csv` | one row per record, fixed column order |
//! | `layout.json` | feature layout (version, columns, fingerprint) |
//! | `cluster_model.json` | centroids + labels |
//! | `neighbor_index.json` | indexed vectors + metric |
//! | `classifier_dataset.json` | popularity classifier input |
//! | `conflicts.json` | cross-source field conflicts |
//! | `diagnostics.json` | run diagnostics |

use crate::record::{Era, FusedGameRecord, PlatformFlags, StorePresence};
use gamecat_common::layout::FeatureFamily;
use gamecat_common::{Error, FeatureLayout, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Leading record columns, before the feature columns
const RECORD_COLUMNS: [&str; 11] = [
    "name",
    "price",
    "release_year",
    "windows",
    "mac",
    "linux",
    "on_steam",
    "on_epic",
    "num_reviews_total",
    "metacritic_score",
    "header_image",
];

/// Trailing model columns, after the feature columns
const MODEL_COLUMNS: [&str; 3] = ["cluster_label", "pca_x", "pca_y"];

/// Paths of the artifacts inside one output directory
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn fused_table(&self) -> PathBuf {
        self.root.join("fused_table.csv")
    }

    pub fn layout(&self) -> PathBuf {
        self.root.join("layout.json")
    }

    pub fn cluster_model(&self) -> PathBuf {
        self.root.join("cluster_model.json")
    }

    pub fn neighbor_index(&self) -> PathBuf {
        self.root.join("neighbor_index.json")
    }

    pub fn classifier_dataset(&self) -> PathBuf {
        self.root.join("classifier_dataset.json")
    }

    pub fn conflicts(&self) -> PathBuf {
        self.root.join("conflicts.json")
    }

    pub fn diagnostics(&self) -> PathBuf {
        self.root.join("diagnostics.json")
    }
}

/// Full header of the fused table for `layout`
pub fn fused_table_header(layout: &FeatureLayout) -> Vec<String> {
    RECORD_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(layout.column_names().map(str::to_string))
        .chain(MODEL_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

pub fn write_fused_table(path: &Path, records: &[FusedGameRecord], layout: &FeatureLayout) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(fused_table_header(layout))?;

    for record in records {
        let vector = record.feature_vector();
        layout.ensure_dimension(vector.len())?;

        let mut row: Vec<String> = vec![
            record.name.clone(),
            record.price.to_string(),
            record.release_year.to_string(),
            bit(record.platforms.windows),
            bit(record.platforms.mac),
            bit(record.platforms.linux),
            bit(record.stores.on_steam),
            bit(record.stores.on_epic),
            record.reviews.to_string(),
            record.quality_score.to_string(),
            record.header_image.clone().unwrap_or_default(),
        ];
        row.extend(layout.columns().iter().zip(&vector).map(|(column, value)| {
            if column.family == FeatureFamily::Popularity {
                value.to_string()
            } else {
                bit(*value == 1.0)
            }
        }));
        row.push(record.cluster.map(|c| c.to_string()).unwrap_or_default());
        let (x, y) = match record.projection {
            Some([x, y]) => (x.to_string(), y.to_string()),
            None => (String::new(), String::new()),
        };
        row.push(x);
        row.push(y);
        writer.write_record(&row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// Load the fused table, verifying its header against `layout`
pub fn load_fused_table(path: &Path, layout: &FeatureLayout) -> Result<Vec<FusedGameRecord>> {
    if !path.is_file() {
        return Err(Error::NotFound(format!("fused table {}", path.display())));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let expected = fused_table_header(layout);
    let actual: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if actual != expected {
        return Err(Error::LayoutMismatch(format!(
            "{} has {} columns that do not match layout v{} ({} columns)",
            path.display(),
            actual.len(),
            layout.version(),
            expected.len()
        )));
    }

    let feature_start = RECORD_COLUMNS.len();
    let model_start = feature_start + layout.dimension();
    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let cell = |i: usize| row.get(i).unwrap_or("");
        let context = |column: usize| format!("row {} column '{}'", line + 1, expected[column]);

        let mut flags = Vec::with_capacity(layout.dimension());
        let mut eras = Vec::new();
        let mut norm_reviews = 0.0;
        for (offset, column) in layout.columns().iter().enumerate() {
            let index = feature_start + offset;
            match column.family {
                FeatureFamily::Popularity => norm_reviews = parse(cell(index), || context(index))?,
                FeatureFamily::Era => {
                    if parse_bit(cell(index), || context(index))? {
                        eras.push(era_for_column(&column.name, || context(index))?);
                    }
                }
                _ => flags.push(parse_bit(cell(index), || context(index))?),
            }
        }
        let era = match eras.as_slice() {
            [era] => *era,
            _ => {
                return Err(Error::InvalidInput(format!(
                    "row {} has {} era flags set (exactly one expected)",
                    line + 1,
                    eras.len()
                )))
            }
        };

        let image = cell(10);
        let cluster = match cell(model_start) {
            "" => None,
            text => Some(parse(text, || context(model_start))?),
        };
        let projection = match (cell(model_start + 1), cell(model_start + 2)) {
            ("", _) | (_, "") => None,
            (x, y) => Some([
                parse(x, || context(model_start + 1))?,
                parse(y, || context(model_start + 2))?,
            ]),
        };

        records.push(FusedGameRecord {
            name: cell(0).to_string(),
            price: parse(cell(1), || context(1))?,
            release_year: parse(cell(2), || context(2))?,
            platforms: PlatformFlags {
                windows: parse_bit(cell(3), || context(3))?,
                mac: parse_bit(cell(4), || context(4))?,
                linux: parse_bit(cell(5), || context(5))?,
            },
            stores: StorePresence {
                on_steam: parse_bit(cell(6), || context(6))?,
                on_epic: parse_bit(cell(7), || context(7))?,
            },
            reviews: parse(cell(8), || context(8))?,
            quality_score: parse(cell(9), || context(9))?,
            header_image: (!image.is_empty()).then(|| image.to_string()),
            era,
            flags,
            norm_reviews,
            cluster,
            projection,
        });
    }
    debug!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(Error::NotFound(format!("snapshot {}", path.display())));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn bit(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn parse<T: std::str::FromStr>(text: &str, context: impl Fn() -> String) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("cannot parse '{}' at {}", text, context())))
}

fn parse_bit(text: &str, context: impl Fn() -> String) -> Result<bool> {
    match text.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(Error::InvalidInput(format!(
            "expected 0 or 1 but found '{}' at {}",
            other,
            context()
        ))),
    }
}

fn era_for_column(name: &str, context: impl Fn() -> String) -> Result<Era> {
    Era::ALL
        .into_iter()
        .find(|era| era.column() == name)
        .ok_or_else(|| Error::InvalidInput(format!("unknown era column at {}", context())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::TaxonomyTable;
    use tempfile::TempDir;

    fn sample(layout: &FeatureLayout) -> FusedGameRecord {
        let flag_count = layout.dimension() - 4;
        let mut flags = vec![false; flag_count];
        flags[0] = true;
        FusedGameRecord {
            name: "Hades, the \"Roguelike\"".to_string(),
            price: 24.99,
            release_year: 2020,
            platforms: PlatformFlags {
                windows: true,
                mac: true,
                linux: false,
            },
            stores: StorePresence {
                on_steam: true,
                on_epic: true,
            },
            reviews: 250000,
            quality_score: 93.0,
            header_image: None,
            era: Era::Recent,
            flags,
            norm_reviews: 0.75,
            cluster: Some(3),
            projection: Some([0.5, -1.25]),
        }
    }

    #[test]
    fn test_fused_table_reloads_identically() {
        let layout = TaxonomyTable::embedded().unwrap().layout().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fused_table.csv");
        let records = vec![sample(&layout)];

        write_fused_table(&path, &records, &layout).unwrap();
        let loaded = load_fused_table(&path, &layout).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_header_mismatch_is_layout_error() {
        let layout = TaxonomyTable::embedded().unwrap().layout().unwrap();
        let other = TaxonomyTable::parse(
            "version = 2\n[[genre]]\ncolumn = \"gen_action\"\nkeywords = [\"action\"]\n",
        )
        .unwrap()
        .layout()
        .unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fused_table.csv");

        write_fused_table(&path, &[sample(&layout)], &layout).unwrap();
        assert!(matches!(
            load_fused_table(&path, &other),
            Err(Error::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_missing_snapshot_is_not_found() {
        let dir = TempDir::new().unwrap();
        let snapshots = SnapshotDir::new(dir.path());
        let result: Result<FeatureLayout> = read_json(&snapshots.layout());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}

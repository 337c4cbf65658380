//! Source tables
//!
//! Each catalog source declares its column schema once ([`SourceSchema`]);
//! loading resolves that schema against the CSV header, fails fast on missing
//! required columns and substitutes central defaults for missing optional ones.

mod schema;

pub use schema::{ColumnSpec, DedupOrder, Field, SourceSchema};

use crate::record::SourceId;
use gamecat_common::{Error, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One raw source row, keyed by logical field; empty cells are absent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSourceRecord {
    values: HashMap<Field, String>,
}

impl RawSourceRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(field, value);
        }
    }

    /// Builder form used by fixtures
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }
}

/// A loaded source table, not yet preprocessed
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub schema: SourceSchema,
    pub records: Vec<RawSourceRecord>,
    /// Fields whose optional column was absent from the header
    pub missing_optional: Vec<Field>,
    /// Header columns not mapped to any field
    pub unmapped_columns: Vec<String>,
}

impl SourceTable {
    /// Build a table directly from records (all schema columns assumed present)
    pub fn from_records(schema: SourceSchema, records: Vec<RawSourceRecord>) -> Self {
        Self {
            schema,
            records,
            missing_optional: Vec::new(),
            unmapped_columns: Vec::new(),
        }
    }

    pub fn id(&self) -> SourceId {
        self.schema.id
    }

    /// True when the source table carries `field` at all
    pub fn has_field(&self, field: Field) -> bool {
        self.schema.column(field).is_some() && !self.missing_optional.contains(&field)
    }

    /// Load a source CSV file
    ///
    /// Fails with [`Error::MissingSource`] when the file does not exist.
    pub fn from_csv_path(path: &Path, schema: SourceSchema) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingSource {
                source_name: schema.id.to_string(),
                path: path.display().to_string(),
            });
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, schema)
    }

    /// Load a source table from any CSV reader (header row required)
    pub fn from_reader<R: Read>(reader: R, schema: SourceSchema) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let header_index: HashMap<&str, usize> =
            headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

        let mut resolved: Vec<(Field, usize)> = Vec::new();
        let mut missing_optional = Vec::new();
        for spec in &schema.columns {
            match header_index.get(spec.column) {
                Some(&index) => resolved.push((spec.field, index)),
                None if spec.required => {
                    return Err(Error::MissingColumn {
                        source_name: schema.id.to_string(),
                        column: spec.column.to_string(),
                    });
                }
                None => {
                    warn!(
                        "Source {} has no '{}' column; default will be used",
                        schema.id, spec.column
                    );
                    missing_optional.push(spec.field);
                }
            }
        }

        let unmapped_columns: Vec<String> = headers
            .iter()
            .filter(|h| schema.columns.iter().all(|spec| spec.column != *h))
            .map(str::to_string)
            .collect();
        if !unmapped_columns.is_empty() {
            debug!(
                "Source {}: ignoring {} unmapped columns",
                schema.id,
                unmapped_columns.len()
            );
        }

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            let mut record = RawSourceRecord::default();
            for &(field, index) in &resolved {
                if let Some(value) = row.get(index) {
                    record.set(field, value.trim());
                }
            }
            records.push(record);
        }

        debug!("Loaded {} rows from source {}", records.len(), schema.id);
        Ok(Self {
            schema,
            records,
            missing_optional,
            unmapped_columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_maps_columns_and_skips_empty_cells() {
        let csv = "name,price,release_date,genres,developer,extra\n\
                   Hades,2499,2020-09-17,Action,Supergiant,x\n\
                   Celeste,,2018-01-25,,,\n";
        let table = SourceTable::from_reader(csv.as_bytes(), SourceSchema::epic()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].get(Field::Name), Some("Hades"));
        assert_eq!(table.records[0].get(Field::Developers), Some("Supergiant"));
        assert_eq!(table.records[1].get(Field::Price), None);
        assert_eq!(table.unmapped_columns, vec!["extra".to_string()]);
        assert!(table.missing_optional.contains(&Field::Platforms));
        assert!(!table.has_field(Field::Platforms));
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = "name,price\nHades,10\n";
        let result = SourceTable::from_reader(csv.as_bytes(), SourceSchema::steam());
        match result {
            Err(Error::MissingColumn { source_name, column }) => {
                assert_eq!(source_name, "steam");
                assert_eq!(column, "release_date");
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = SourceTable::from_csv_path(&dir.path().join("none.csv"), SourceSchema::epic());
        assert!(matches!(result, Err(Error::MissingSource { .. })));
    }
}

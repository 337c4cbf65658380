//! Common error types for gamecat

use thiserror::Error;

/// Common result type for gamecat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error conditions across the pipeline
///
/// Recoverable data-quality events are never reported through this type;
/// they are counted in [`crate::RunDiagnostics`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A required input file does not exist (checked before any transform)
    #[error("Missing source file for {source_name}: {path}")]
    MissingSource { source_name: String, path: String },

    /// A required column is absent from a source table
    #[error("Source {source_name} is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// Not enough records to form the requested number of clusters
    #[error("Clustering needs at least {required} records, got {available}")]
    InsufficientRecords { required: usize, available: usize },

    /// Vector dimensionality or layout fingerprint does not match the persisted layout
    #[error("Feature layout mismatch: {0}")]
    LayoutMismatch(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input to an operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested artifact or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Snapshot (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data table or config file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a dimensionality mismatch between a query and an index
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Error::LayoutMismatch(format!(
            "expected {}-dimensional vector, got {} (feature layout version changed?)",
            expected, actual
        ))
    }
}

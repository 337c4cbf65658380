//! # gamecat common library
//!
//! Shared code for the catalog fusion pipeline and its consumers:
//! - Error type used across every pipeline stage
//! - Configuration loading (TOML + environment + compiled defaults)
//! - The versioned feature-vector layout shared by the cluster model,
//!   the neighbor index and the popularity classifier
//! - Run diagnostics (counts of dropped, defaulted and imputed records)

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod layout;

pub use diagnostics::RunDiagnostics;
pub use error::{Error, Result};
pub use layout::{FeatureColumn, FeatureFamily, FeatureLayout};

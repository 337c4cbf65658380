//! Feature synthesis
//!
//! - [`taxonomy`]: versioned keyword table and the feature layout it defines
//! - [`synthesizer`]: multi-hot flags, era buckets, popularity scaling
//! - [`classifier`]: input table for the popularity classifier

pub mod classifier;
pub mod synthesizer;
pub mod taxonomy;

pub use classifier::{classifier_dataset, ClassifierDataset};
pub use synthesizer::{normalize_popularity, FeatureSynthesizer};
pub use taxonomy::{derive_label, EraThresholds, KeywordColumn, TaxonomyTable, POPULARITY_COLUMN};

//! gamecat-fusion library interface
//!
//! Fuses two storefront catalogs into one canonical record set, derives
//! multi-hot feature vectors from their free-text taxonomies, clusters the
//! result and serves cosine nearest-neighbor recommendations over it.
//!
//! Stage order (see [`pipeline`]):
//! `sources` -> `preprocess` -> `fusion` -> `curation` -> `features` -> `model`,
//! with `snapshot` persisting the artifacts and `serving` reading them back.

pub mod curation;
pub mod features;
pub mod fusion;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod serving;
pub mod snapshot;
pub mod sources;

pub use normalize::{is_bundle_or_junk, normalize, CanonicalKey};
pub use pipeline::{write_snapshots, Pipeline, PipelineOutput};
pub use record::{Era, FusedGameRecord, FusedRecord, SourceId, SourceRecord};
pub use serving::{Recommendation, Recommender};

//! Catalog fusion
//!
//! Entity resolution by canonical key across the two sources, with
//! priority-based field coalescing and conflict reporting.

mod conflict;
mod merger;

pub use conflict::{ConflictReport, ConflictSeverity};
pub use merger::{fuse_sources, FusionOutput};

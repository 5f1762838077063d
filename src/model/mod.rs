//! Core data types for manifests, scan outcomes, and run summaries.
//!
//! - [`ManifestRecord`] - A discovered dependency manifest and the runtime variant that parses it
//! - [`RuntimeVariantGroup`] - Manifests grouped by runtime variant, in discovery order
//! - [`ScanOutcome`] - Classified result of one scan engine invocation
//! - [`ScanMode`] - Per-manifest or whole-tree scanning
//! - [`RunSummary`] - Everything that happened during one run
//!
//! # Example
//!
//! ```
//! use depscan::{ManifestRecord, RuntimeVariantGroup};
//!
//! let mut group = RuntimeVariantGroup::new();
//! group.insert(ManifestRecord::new("a/package.json", "npm"));
//! group.insert(ManifestRecord::new("c/requirements.txt", "python-3"));
//!
//! assert_eq!(group.len(), 2);
//! assert_eq!(group.variants().collect::<Vec<_>>(), vec!["npm", "python-3"]);
//! ```

mod manifest;
mod outcome;
mod run;

pub use manifest::*;
pub use outcome::*;
pub use run::*;

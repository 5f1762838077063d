//! Error types.
//!
//! Only conditions that stop a run surface as [`ScanError`]. Engine
//! failures, missing images and unreadable intermediate results are
//! recovered where they happen and show up as
//! [`ScanOutcome`](crate::model::ScanOutcome) or
//! [`FoldOutcome`](crate::aggregator::FoldOutcome) values instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to move artifact {name}: {source}")]
    ArtifactMove {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize scan results: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_artifact_move_display_and_source() {
        let err = ScanError::ArtifactMove {
            name: "snyk-result.json".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("snyk-result.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_configuration_display() {
        let err = ScanError::Configuration("bad".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad");
    }
}

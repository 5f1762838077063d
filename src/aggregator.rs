//! Merging of per-invocation scan results.
//!
//! The engine overwrites the same result file on every invocation, so the
//! file has to be folded into the [`ResultAggregator`] right after each
//! invocation. The merged `vulnerabilities` list is the concatenation of
//! every folded document's list, in fold order, never deduplicated.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::ScanError;

const VULNERABILITIES: &str = "vulnerabilities";

/// What one result file contributed to the merged document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FoldOutcome {
    /// First valid document; it became the merged document.
    Initialized { count: usize },
    /// Its vulnerabilities were appended to the merged document.
    Appended { count: usize },
    /// Valid document with an empty vulnerabilities list.
    Empty,
    /// The engine did not leave a result file.
    Missing,
    /// The file could not be read or parsed, or had no vulnerabilities list.
    Invalid { reason: String },
}

impl FoldOutcome {
    /// Number of vulnerabilities this fold added to the merged document.
    pub fn contributed(&self) -> usize {
        match self {
            FoldOutcome::Initialized { count } | FoldOutcome::Appended { count } => *count,
            FoldOutcome::Empty | FoldOutcome::Missing | FoldOutcome::Invalid { .. } => 0,
        }
    }
}

impl std::fmt::Display for FoldOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FoldOutcome::Initialized { count } => write!(f, "set {} vulns", count),
            FoldOutcome::Appended { count } => write!(f, "appended {} vulns", count),
            FoldOutcome::Empty => write!(f, "no vulns"),
            FoldOutcome::Missing => write!(f, "no result file"),
            FoldOutcome::Invalid { reason } => write!(f, "invalid: {}", reason),
        }
    }
}

/// Accumulates scan engine result documents.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    merged: Option<Value>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the result file at `path` and folds it in.
    ///
    /// Read and parse failures are logged and reported as
    /// [`FoldOutcome::Missing`] or [`FoldOutcome::Invalid`]; they never
    /// disturb what has already been merged.
    pub fn fold_file(&mut self, path: &Path) -> FoldOutcome {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("No results file at {}", path.display());
                return FoldOutcome::Missing;
            }
            Err(e) => {
                error!("Error reading results file {}: {}", path.display(), e);
                return FoldOutcome::Invalid {
                    reason: e.to_string(),
                };
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(document) => self.fold(document),
            Err(e) => {
                error!("Error parsing results file {}: {}", path.display(), e);
                FoldOutcome::Invalid {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Folds one parsed result document in.
    pub fn fold(&mut self, document: Value) -> FoldOutcome {
        let count = match document.get(VULNERABILITIES).and_then(Value::as_array) {
            Some(vulns) => vulns.len(),
            None => {
                error!("No vulns in json: {}", summarize(&document));
                return FoldOutcome::Invalid {
                    reason: "document has no vulnerabilities list".to_string(),
                };
            }
        };

        if self.merged.is_none() {
            info!("set {} vulns", count);
            self.merged = Some(document);
            return FoldOutcome::Initialized { count };
        }

        if count == 0 {
            return FoldOutcome::Empty;
        }

        let Value::Object(mut incoming) = document else {
            return FoldOutcome::Empty;
        };
        let target = self
            .merged
            .as_mut()
            .and_then(|m| m.get_mut(VULNERABILITIES))
            .and_then(Value::as_array_mut);
        if let (Some(target), Some(Value::Array(vulns))) = (target, incoming.remove(VULNERABILITIES)) {
            target.extend(vulns);
        }
        info!("appended {} vulns", count);
        FoldOutcome::Appended { count }
    }

    pub fn vulnerability_count(&self) -> usize {
        self.merged
            .as_ref()
            .and_then(|m| m.get(VULNERABILITIES))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_none()
    }

    /// The merged document, or an empty report if nothing valid was folded.
    pub fn into_document(self) -> Value {
        self.merged
            .unwrap_or_else(|| json!({ VULNERABILITIES: [] }))
    }

    /// Writes the merged document to `path`, replacing whatever is there.
    pub fn write_to(self, path: &Path) -> Result<usize, ScanError> {
        let count = self.vulnerability_count();
        let document = self.into_document();
        let content = serde_json::to_string(&document)?;
        fs::write(path, content).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(count)
    }
}

/// Short description of a document for error logs.
fn summarize(document: &Value) -> String {
    match document {
        Value::Object(map) => format!(
            "object with keys [{}]",
            map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        ),
        Value::Array(items) => format!("array of {} items", items.len()),
        other => {
            let text = other.to_string();
            if text.chars().count() > 80 {
                format!("{}...", text.chars().take(80).collect::<String>())
            } else {
                text
            }
        }
    }
}

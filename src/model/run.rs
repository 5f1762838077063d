use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ScanOutcome;
use crate::aggregator::FoldOutcome;

/// How the scan engine is pointed at the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// One isolated engine run per discovered manifest, results merged afterwards.
    #[default]
    PerManifest,
    /// A single engine run over the whole tree; the engine finds manifests itself.
    AllProjects,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::PerManifest => "per-manifest",
            ScanMode::AllProjects => "all-projects",
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One engine invocation and what came of it.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationRecord {
    pub runtime_variant: String,
    /// `None` for a whole-tree invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    pub outcome: ScanOutcome,
    /// What the invocation added to the merged result, per-manifest mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contribution: Option<FoldOutcome>,
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: ScanMode,
    pub invocations: Vec<InvocationRecord>,
    /// Size of the merged vulnerabilities list; `None` in whole-tree mode,
    /// where the engine's result file is published untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_vulnerabilities: Option<usize>,
    /// Artifact file names moved to the report directory.
    pub published: Vec<String>,
}

impl RunSummary {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            invocations: Vec::new(),
            total_vulnerabilities: None,
            published: Vec::new(),
        }
    }

    pub fn error_count(&self) -> usize {
        self.invocations
            .iter()
            .filter(|i| i.outcome.is_error())
            .count()
    }

    /// Invocations whose result file added at least one vulnerability.
    pub fn contributing_scans(&self) -> usize {
        self.invocations
            .iter()
            .filter_map(|i| i.contribution.as_ref())
            .filter(|c| c.contributed() > 0)
            .count()
    }
}

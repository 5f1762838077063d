//! One complete scan run.
//!
//! # Flow
//! 1. Locate manifests in the workspace ([`find_manifests`]).
//! 2. For each manifest, in group order: clear the intermediate result
//!    file, run one isolated scan, fold the fresh result file in.
//! 3. Write the merged result once.
//! 4. Move the artifacts to the report directory.
//!
//! In whole-tree mode steps 1-3 are replaced by clearing the previous
//! run's result and HTML report, a single engine run, and HTML rendering of
//! its result file.
//!
//! Invocations are strictly sequential: the engine always writes to the
//! same result path, so a result must be folded before the next
//! invocation starts.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::aggregator::ResultAggregator;
use crate::error::ScanError;
use crate::invoker::ScanInvoker;
use crate::locator::find_manifests;
use crate::model::{InvocationRecord, RunSummary, ScanMode};
use crate::publisher::{artifacts_for, publish_artifacts, HTML_REPORT_FILE, RESULT_FILE};
use crate::render::render_html;
use crate::runtime::ContainerRuntime;

pub struct ScanRun<R> {
    invoker: ScanInvoker<R>,
    mode: ScanMode,
    /// Local view of the project tree; engine results appear here.
    workspace: PathBuf,
    report_dir: PathBuf,
    renderer: String,
}

impl<R: ContainerRuntime> ScanRun<R> {
    pub fn new(
        invoker: ScanInvoker<R>,
        mode: ScanMode,
        workspace: impl Into<PathBuf>,
        report_dir: impl Into<PathBuf>,
        renderer: impl Into<String>,
    ) -> Self {
        Self {
            invoker,
            mode,
            workspace: workspace.into(),
            report_dir: report_dir.into(),
            renderer: renderer.into(),
        }
    }

    pub fn result_path(&self) -> PathBuf {
        self.workspace.join(RESULT_FILE)
    }

    pub async fn run(&self) -> Result<RunSummary, ScanError> {
        let mut summary = RunSummary::new(self.mode);

        match self.mode {
            ScanMode::PerManifest => self.run_per_manifest(&mut summary).await?,
            ScanMode::AllProjects => self.run_all_projects(&mut summary).await,
        }

        info!("Moving results to report directory");
        summary.published = publish_artifacts(
            &self.workspace,
            &self.report_dir,
            artifacts_for(self.mode),
        )?;

        info!("Finished");
        Ok(summary)
    }

    async fn run_per_manifest(&self, summary: &mut RunSummary) -> Result<(), ScanError> {
        info!("Trying to find manifest files");
        let manifests = find_manifests(&self.workspace)?;
        if manifests.is_empty() {
            warn!("No manifest files found in {}", self.workspace.display());
        } else {
            info!(
                "Found {} manifests across {} runtime variants",
                manifests.len(),
                manifests.variants().count()
            );
        }

        let result_path = self.result_path();
        let mut aggregator = ResultAggregator::new();

        for (variant, records) in manifests.iter() {
            for record in records {
                clear_stale_result(&result_path);
                let outcome = self.invoker.scan_manifest(record).await;
                let contribution = aggregator.fold_file(&result_path);

                summary.invocations.push(InvocationRecord {
                    runtime_variant: variant.to_string(),
                    manifest: Some(record.path.clone()),
                    outcome,
                    contribution: Some(contribution),
                });
            }
        }

        if aggregator.is_empty() {
            warn!("No scan produced a valid result; writing an empty report");
        }
        info!("Writing results");
        summary.total_vulnerabilities = Some(aggregator.write_to(&result_path)?);
        Ok(())
    }

    async fn run_all_projects(&self, summary: &mut RunSummary) {
        let input = self.result_path();
        let output = self.workspace.join(HTML_REPORT_FILE);
        clear_stale_result(&input);
        clear_stale_result(&output);

        let outcome = self.invoker.scan_all_projects().await;
        summary.invocations.push(InvocationRecord {
            runtime_variant: self.invoker.settings().all_projects_image.clone(),
            manifest: None,
            outcome,
            contribution: None,
        });

        if !input.exists() {
            warn!("Scan left no result file; skipping HTML report");
            return;
        }

        info!("Creating HTML report from json");
        if let Err(e) = render_html(&self.renderer, &input, &output).await {
            warn!("HTML report not created: {}", e);
        }
    }
}

/// Removes an artifact left by a previous invocation so an engine that dies
/// before writing cannot have its predecessor's output read or published.
fn clear_stale_result(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove stale result {}: {}", path.display(), e),
    }
}

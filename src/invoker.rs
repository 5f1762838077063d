//! Scan engine invocation.
//!
//! [`ScanInvoker`] prepares and runs one isolated scan container, either
//! for a single manifest or for the whole project tree, and classifies how
//! it ended. Every failure is turned into a [`ScanOutcome`]; nothing here
//! aborts a run.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::model::{ExitSignal, ManifestRecord, ScanOutcome};
use crate::runtime::{ContainerRuntime, ContainerSpec, RuntimeError, VolumeMount};

/// Where the project is mounted for per-manifest scans.
pub const PER_MANIFEST_MOUNT: &str = "/project";

/// Where the project is mounted for whole-tree scans.
pub const ALL_PROJECTS_MOUNT: &str = "/app";

/// Number of trailing token characters left visible by [`redact_token`].
const VISIBLE_TOKEN_CHARS: usize = 8;

/// Masks a credential for logging, keeping only its last 8 characters.
///
/// Tokens of 8 characters or fewer are masked entirely.
pub fn redact_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= VISIBLE_TOKEN_CHARS {
        return "*".repeat(len);
    }
    let hidden = len - VISIBLE_TOKEN_CHARS;
    let visible: String = token.chars().skip(hidden).collect();
    format!("{}{}", "*".repeat(hidden), visible)
}

/// Invocation parameters shared by every scan in a run.
#[derive(Clone)]
pub struct InvokerSettings {
    /// Project path as seen by the container runtime's host.
    pub host_project_path: PathBuf,
    pub token: String,
    /// Environment variable the engine reads the token from.
    pub token_env: String,
    /// Image repository for per-manifest scans; the runtime variant is the tag.
    pub per_manifest_repo: String,
    /// Full image reference for whole-tree scans.
    pub all_projects_image: String,
    pub detection_depth: u32,
    pub user: Option<String>,
}

impl std::fmt::Debug for InvokerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokerSettings")
            .field("host_project_path", &self.host_project_path)
            .field("token", &redact_token(&self.token))
            .field("token_env", &self.token_env)
            .field("per_manifest_repo", &self.per_manifest_repo)
            .field("all_projects_image", &self.all_projects_image)
            .field("detection_depth", &self.detection_depth)
            .field("user", &self.user)
            .finish()
    }
}

pub struct ScanInvoker<R> {
    runtime: R,
    settings: InvokerSettings,
}

impl<R: ContainerRuntime> ScanInvoker<R> {
    pub fn new(runtime: R, settings: InvokerSettings) -> Self {
        Self { runtime, settings }
    }

    pub fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Image reference for a runtime variant: `<repo>:<variant>`.
    pub fn image_for(&self, runtime_variant: &str) -> String {
        format!("{}:{}", self.settings.per_manifest_repo, runtime_variant)
    }

    pub fn per_manifest_command(manifest: &ManifestRecord) -> Vec<String> {
        vec![
            "test".to_string(),
            format!("--file={}", manifest.container_path()),
            "--skip-unresolved".to_string(),
        ]
    }

    pub fn all_projects_command(&self) -> Vec<String> {
        vec![
            "snyk".to_string(),
            "test".to_string(),
            "--all-projects".to_string(),
            "--skip-unresolved".to_string(),
            format!("--detection-depth={}", self.settings.detection_depth),
            "--strict-out-of-sync=false".to_string(),
            format!(
                "--json-file-output={}/{}",
                ALL_PROJECTS_MOUNT,
                crate::publisher::RESULT_FILE
            ),
        ]
    }

    fn container_spec(&self, image: String, command: Vec<String>, mount_point: &str) -> ContainerSpec {
        ContainerSpec {
            image,
            command,
            mount: VolumeMount {
                host_path: self.settings.host_project_path.clone(),
                container_path: mount_point.to_string(),
            },
            user: self.settings.user.clone(),
            env: vec![(self.settings.token_env.clone(), self.settings.token.clone())],
        }
    }

    /// Scans a single manifest with the image for its runtime variant.
    pub async fn scan_manifest(&self, manifest: &ManifestRecord) -> ScanOutcome {
        let image = self.image_for(&manifest.runtime_variant);
        let command = Self::per_manifest_command(manifest);
        let spec = self.container_spec(image, command, PER_MANIFEST_MOUNT);
        let scan_target = manifest.container_path();

        let outcome = self.execute(&spec).await;
        log_outcome(&scan_target, &outcome);
        outcome
    }

    /// Scans the whole tree in one container; the engine finds manifests itself.
    pub async fn scan_all_projects(&self) -> ScanOutcome {
        let spec = self.container_spec(
            self.settings.all_projects_image.clone(),
            self.all_projects_command(),
            ALL_PROJECTS_MOUNT,
        );

        let outcome = self.execute(&spec).await;
        log_outcome("all projects", &outcome);
        outcome
    }

    async fn execute(&self, spec: &ContainerSpec) -> ScanOutcome {
        info!("Pulling image {}", spec.image);
        if let Err(e) = self.runtime.pull(&spec.image).await {
            return ScanOutcome::classify(signal_from_error(e));
        }

        info!(
            runtime = self.runtime.name(),
            "Running scan: {} {}",
            spec.image,
            spec.command.join(" ")
        );
        match self.runtime.run(spec).await {
            Ok(code) => ScanOutcome::from_exit_code(code),
            Err(e) => ScanOutcome::classify(signal_from_error(e)),
        }
    }
}

fn signal_from_error(err: RuntimeError) -> ExitSignal {
    match err {
        RuntimeError::ImageNotFound { image, .. } => ExitSignal::ImageNotFound { image },
        other => ExitSignal::RuntimeFailure {
            reason: other.to_string(),
        },
    }
}

fn log_outcome(scan_target: &str, outcome: &ScanOutcome) {
    let exit_code = outcome.exit_code();
    match outcome {
        ScanOutcome::Success => {
            info!(scan_target, ?exit_code, "Scan finished: {}", outcome)
        }
        ScanOutcome::VulnerabilitiesFound | ScanOutcome::NoSupportedManifest => {
            warn!(scan_target, ?exit_code, "Container exit: {}", outcome)
        }
        ScanOutcome::EngineError
        | ScanOutcome::ImageNotFound { .. }
        | ScanOutcome::Unknown { .. } => {
            error!(scan_target, ?exit_code, "Container exit: {}", outcome)
        }
    }
}

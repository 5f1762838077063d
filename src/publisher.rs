//! Moving finished artifacts into the report directory.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::error::ScanError;
use crate::model::ScanMode;

/// Merged scan results.
pub const RESULT_FILE: &str = "snyk-result.json";
/// Engine error log.
pub const ERROR_LOG_FILE: &str = "snyk-error.log";
/// Rendered HTML report.
pub const HTML_REPORT_FILE: &str = "snyk_report.html";
/// Stylesheet for the HTML report.
pub const HTML_STYLESHEET_FILE: &str = "snyk_report.css";

/// Artifacts each mode can produce. Not every run produces all of them.
pub fn artifacts_for(mode: ScanMode) -> &'static [&'static str] {
    match mode {
        ScanMode::PerManifest => &[
            RESULT_FILE,
            ERROR_LOG_FILE,
            HTML_REPORT_FILE,
            HTML_STYLESHEET_FILE,
        ],
        ScanMode::AllProjects => &[RESULT_FILE, HTML_REPORT_FILE],
    }
}

/// Moves `name` from `from_dir` to `to_dir`.
///
/// Returns `Ok(false)` without touching anything when the source does not
/// exist or when source and destination are the same file. Any other
/// failure, including a missing destination directory, is an error.
pub fn move_artifact(from_dir: &Path, to_dir: &Path, name: &str) -> Result<bool, ScanError> {
    let source = from_dir.join(name);
    let destination = to_dir.join(name);
    let move_error = |e: io::Error| ScanError::ArtifactMove {
        name: name.to_string(),
        source: e,
    };

    match fs::symlink_metadata(&source) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Artifact {} not produced, skipping", name);
            return Ok(false);
        }
        Err(e) => return Err(move_error(e)),
    }

    if is_same_file(&source, &destination) {
        debug!("Artifact {} already in place", name);
        return Ok(false);
    }

    if let Err(rename_err) = fs::rename(&source, &destination) {
        // rename cannot cross filesystems; fall back to copy and delete when
        // the destination directory is usable.
        if !to_dir.is_dir() {
            return Err(move_error(rename_err));
        }
        fs::copy(&source, &destination).map_err(move_error)?;
        fs::remove_file(&source).map_err(move_error)?;
    }

    info!("Moved {} to {}", name, to_dir.display());
    Ok(true)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Moves every artifact in `names`, returning the ones actually moved.
pub fn publish_artifacts(
    from_dir: &Path,
    to_dir: &Path,
    names: &[&str],
) -> Result<Vec<String>, ScanError> {
    let mut moved = Vec::new();
    for name in names {
        if move_artifact(from_dir, to_dir, name)? {
            moved.push(name.to_string());
        }
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_artifact() {
        let workspace = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        fs::write(workspace.path().join(RESULT_FILE), "{}").unwrap();

        let moved = move_artifact(workspace.path(), reports.path(), RESULT_FILE).unwrap();

        assert!(moved);
        assert!(!workspace.path().join(RESULT_FILE).exists());
        assert_eq!(
            fs::read_to_string(reports.path().join(RESULT_FILE)).unwrap(),
            "{}"
        );
    }

    #[test]
    fn test_move_overwrites_existing_destination() {
        let workspace = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        fs::write(workspace.path().join(RESULT_FILE), "new").unwrap();
        fs::write(reports.path().join(RESULT_FILE), "old").unwrap();

        move_artifact(workspace.path(), reports.path(), RESULT_FILE).unwrap();

        assert_eq!(
            fs::read_to_string(reports.path().join(RESULT_FILE)).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_move_missing_source_is_noop() {
        let workspace = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();

        let moved = move_artifact(workspace.path(), reports.path(), ERROR_LOG_FILE).unwrap();

        assert!(!moved);
        assert!(!reports.path().join(ERROR_LOG_FILE).exists());
    }

    #[test]
    fn test_move_onto_itself_is_noop() {
        let workspace = TempDir::new().unwrap();
        fs::write(workspace.path().join(RESULT_FILE), "{}").unwrap();

        let moved = move_artifact(workspace.path(), workspace.path(), RESULT_FILE).unwrap();

        assert!(!moved);
        assert!(workspace.path().join(RESULT_FILE).exists());
    }

    #[test]
    fn test_move_to_missing_directory_fails() {
        let workspace = TempDir::new().unwrap();
        fs::write(workspace.path().join(RESULT_FILE), "{}").unwrap();
        let missing = workspace.path().join("no-such-dir");

        let result = move_artifact(workspace.path(), &missing, RESULT_FILE);

        assert!(matches!(result, Err(ScanError::ArtifactMove { .. })));
        assert!(workspace.path().join(RESULT_FILE).exists());
    }

    #[test]
    fn test_publish_artifacts_reports_moved_files() {
        let workspace = TempDir::new().unwrap();
        let reports = TempDir::new().unwrap();
        fs::write(workspace.path().join(RESULT_FILE), "{}").unwrap();
        fs::write(workspace.path().join(HTML_REPORT_FILE), "<html/>").unwrap();

        let moved = publish_artifacts(
            workspace.path(),
            reports.path(),
            artifacts_for(ScanMode::PerManifest),
        )
        .unwrap();

        assert_eq!(moved, vec![RESULT_FILE, HTML_REPORT_FILE]);
    }

    #[test]
    fn test_artifacts_for_mode() {
        assert_eq!(artifacts_for(ScanMode::PerManifest).len(), 4);
        assert_eq!(
            artifacts_for(ScanMode::AllProjects),
            &[RESULT_FILE, HTML_REPORT_FILE]
        );
    }
}

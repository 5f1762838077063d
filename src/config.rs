//! Configuration file handling.
//!
//! Loads depscan configuration from a TOML file. Every field has a
//! default, so the file is optional and may set any subset of fields.
//!
//! # Configuration Location
//!
//! Unless `--config` points elsewhere, the file is read from:
//! - Linux: `~/.config/depscan/config.toml`
//! - macOS: `~/Library/Application Support/depscan/config.toml`
//! - Windows: `%APPDATA%\depscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! mode = "per-manifest"
//! workspace_dir = "/var/src"
//! report_dir = "/var/reports"
//! per_manifest_repo = "snyk/snyk-cli"
//! all_projects_image = "snyk/snyk:linux"
//! detection_depth = 6
//! token_env = "SNYK_TOKEN"
//! renderer = "snyk-to-html"
//! log_level = "info"
//! log_format = "text"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;
use crate::model::ScanMode;

/// Application configuration.
///
/// The manifest table and the excluded directory names are fixed and
/// deliberately absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default: per-manifest
    pub mode: ScanMode,

    /// Local directory where the project is visible and where the engine
    /// writes its results.
    ///
    /// Default: `/var/src`
    pub workspace_dir: PathBuf,

    /// Directory the final artifacts are moved into.
    ///
    /// Default: `/var/reports`
    pub report_dir: PathBuf,

    /// Image repository for per-manifest scans; runtime variants are its tags.
    ///
    /// Default: `snyk/snyk-cli`
    pub per_manifest_repo: String,

    /// Image used for whole-tree scans.
    ///
    /// Default: `snyk/snyk:linux`
    pub all_projects_image: String,

    /// Directory depth the engine searches in whole-tree mode.
    ///
    /// Default: 6
    pub detection_depth: u32,

    /// Environment variable carrying the scan token into the container.
    ///
    /// Default: `SNYK_TOKEN`
    pub token_env: String,

    /// JSON to HTML renderer executable.
    ///
    /// Default: `snyk-to-html`
    pub renderer: String,

    /// User the scan containers run as. When unset, the owner of the
    /// workspace directory is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_user: Option<String>,

    /// Default: `info`. `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Default: text
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ScanMode::PerManifest,
            workspace_dir: PathBuf::from("/var/src"),
            report_dir: PathBuf::from("/var/reports"),
            per_manifest_repo: "snyk/snyk-cli".to_string(),
            all_projects_image: "snyk/snyk:linux".to_string(),
            detection_depth: 6,
            token_env: "SNYK_TOKEN".to_string(),
            renderer: "snyk-to-html".to_string(),
            container_user: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from [`config_path`](Self::config_path)
    /// when `path` is `None`.
    ///
    /// A missing default file yields the default configuration; an explicitly
    /// requested file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Returns the default path of the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depscan")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.mode, ScanMode::PerManifest);
        assert_eq!(config.workspace_dir, PathBuf::from("/var/src"));
        assert_eq!(config.report_dir, PathBuf::from("/var/reports"));
        assert_eq!(config.detection_depth, 6);
        assert_eq!(config.token_env, "SNYK_TOKEN");
        assert!(config.container_user.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            mode = "all-projects"
            detection_depth = 3
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, ScanMode::AllProjects);
        assert_eq!(config.detection_depth, 3);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.per_manifest_repo, "snyk/snyk-cli");
    }

    #[test]
    fn test_invalid_file() {
        assert!(Config::from_toml("mode = \"sideways\"").is_err());
        assert!(Config::from_toml("detection_depth = \"deep\"").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depscan.toml");
        fs::write(&path, "report_dir = \"/tmp/reports\"\ncontainer_user = \"1001\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.container_user.as_deref(), Some("1001"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}

//! Dependency manifest discovery.
//!
//! Walks a project tree and maps every recognised manifest file to the
//! scanner runtime variant (image tag) able to parse it.
//!
//! # Recognised manifests
//!
//! File names are matched case-insensitively against [`MANIFEST_TABLE`].
//! Anything below a dependency cache directory (see [`EXCLUDED_DIRS`]) is
//! skipped, since those files are not authored by the project.
//!
//! # Example
//!
//! ```
//! use depscan::locator::runtime_variant_for;
//!
//! assert_eq!(runtime_variant_for("Package-Lock.JSON"), Some("npm"));
//! assert_eq!(runtime_variant_for("README.md"), None);
//! ```

use std::path::Path;

use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::ScanError;
use crate::model::{ManifestRecord, RuntimeVariantGroup};

/// Manifest file name (lowercase) to scanner runtime variant.
pub const MANIFEST_TABLE: &[(&str, &str)] = &[
    // Node
    ("yarn.lock", "npm"),
    ("package-lock.json", "npm"),
    ("package.json", "npm"),
    // Ruby
    ("gemfile", "rubygems"),
    ("gemfile.lock", "rubygems"),
    // JVM
    ("pom.xml", "maven-3.5.4"),
    ("build.gradle", "gradle-5.4"),
    ("build.gradle.kts", "gradle-5.4"),
    ("build.sbt", "sbt-1.0.4"),
    // Python
    ("requirements.txt", "python-3"),
    ("pipfile", "python-3"),
    ("pipfile.lock", "python-3"),
    ("pyproject.toml", "python-3"),
    ("poetry.lock", "python-3"),
    // Go
    ("gopkg.lock", "npm"),
    ("go.mod", "npm"),
    ("vendor.json", "npm"),
    // .NET
    ("project.json", "nuget"),
    ("project.assets.json", "nuget"),
    ("packages.config", "nuget"),
    ("paket.dependencies", "nuget"),
    // PHP
    ("composer.lock", "npm"),
    // CocoaPods
    ("podfile", "npm"),
    ("podfile.lock", "npm"),
];

/// Directory names whose contents are vendored dependencies.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "vendor", "bower_components", "dependencies"];

/// Returns the runtime variant for a manifest file name, if recognised.
pub fn runtime_variant_for(file_name: &str) -> Option<&'static str> {
    MANIFEST_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(file_name))
        .map(|(_, variant)| *variant)
}

/// True if a directory with this name holds vendored dependencies.
pub fn is_excluded_dir(dir_name: &str) -> bool {
    EXCLUDED_DIRS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(dir_name))
}

fn is_excluded_entry(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && is_excluded_dir(&entry.file_name().to_string_lossy())
}

/// Finds every recognised manifest below `root`.
///
/// Entries are visited in file-name order, so the result is the same for
/// the same tree on every run. Unreadable subdirectories are logged and
/// skipped.
///
/// # Errors
///
/// Returns an error only if `root` itself is not a readable directory.
pub fn find_manifests(root: &Path) -> Result<RuntimeVariantGroup, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|source| ScanError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::Configuration(format!(
            "project path {} is not a directory",
            root.display()
        )));
    }

    let mut group = RuntimeVariantGroup::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded_entry(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(variant) = runtime_variant_for(&file_name) else {
            continue;
        };

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        info!(variant, "Found manifest: {}", relative.display());
        group.insert(ManifestRecord::new(relative, variant));
    }

    Ok(group)
}

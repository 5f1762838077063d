use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A dependency manifest found in the project tree.
///
/// The path is relative to the project root. Records are never
/// deduplicated: two `package.json` files in different directories are
/// two records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub path: PathBuf,
    pub runtime_variant: String,
}

impl ManifestRecord {
    pub fn new(path: impl Into<PathBuf>, runtime_variant: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            runtime_variant: runtime_variant.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The manifest path as the scan engine expects it inside the container:
    /// forward slashes, no leading `./`.
    pub fn container_path(&self) -> String {
        let raw = self.path.to_string_lossy().replace('\\', "/");
        let mut trimmed = raw.as_str();
        while let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        }
        trimmed.to_string()
    }
}

/// Manifests grouped by runtime variant.
///
/// Both the variants and the records within each variant keep the order in
/// which they were inserted, so scanning a given tree always happens in the
/// same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeVariantGroup {
    groups: Vec<(String, Vec<ManifestRecord>)>,
}

impl RuntimeVariantGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ManifestRecord) {
        match self
            .groups
            .iter_mut()
            .find(|(variant, _)| *variant == record.runtime_variant)
        {
            Some((_, records)) => records.push(record),
            None => self
                .groups
                .push((record.runtime_variant.clone(), vec![record])),
        }
    }

    pub fn get(&self, variant: &str) -> Option<&[ManifestRecord]> {
        self.groups
            .iter()
            .find(|(v, _)| v == variant)
            .map(|(_, records)| records.as_slice())
    }

    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(variant, _)| variant.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ManifestRecord])> {
        self.groups
            .iter()
            .map(|(variant, records)| (variant.as_str(), records.as_slice()))
    }

    /// All records in scan order: variant by variant, then discovery order.
    pub fn records(&self) -> impl Iterator<Item = &ManifestRecord> {
        self.groups.iter().flat_map(|(_, records)| records.iter())
    }

    /// Total number of manifests across all variants.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

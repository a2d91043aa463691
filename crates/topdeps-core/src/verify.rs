//! Destination inspection
//!
//! Used after a run to report which selected packages never made it to disk,
//! and by `topdeps verify` to check a destination against expectations.

use std::path::Path;
use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::MANIFEST_FILE;
use crate::name::PackageName;

/// Snapshot of a destination root
#[derive(Debug, Clone, Default)]
pub struct DestinationSummary {
    /// Non-hidden top-level entry names, sorted
    pub entries: Vec<String>,
    /// Total size in bytes of all regular files below the root
    pub total_bytes: u64,
}

impl DestinationSummary {
    /// Inspect a destination root
    pub fn scan(root: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                entries.push(name);
            }
        }
        entries.sort();

        let total_bytes = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum();

        Ok(Self {
            entries,
            total_bytes,
        })
    }

    /// Number of top-level entries
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Average bytes per top-level entry (0 when empty)
    pub fn average_bytes(&self) -> u64 {
        if self.entries.is_empty() {
            0
        } else {
            self.total_bytes / self.entries.len() as u64
        }
    }
}

/// Whether a package is present in flattened form with its manifest
pub fn has_package(root: &Path, name: &PackageName) -> bool {
    root.join(name.flattened()).join(MANIFEST_FILE).is_file()
}

/// Names whose flattened directory is absent from `root`
pub fn missing_packages<'a>(root: &Path, names: &'a [PackageName]) -> Vec<&'a PackageName> {
    names
        .iter()
        .filter(|name| !root.join(name.flattened()).exists())
        .collect()
}

//! Destination directory layout
//!
//! Two operations shape the destination root:
//!
//! - [`place_package`] moves one extracted package to `root/<name>`, nesting
//!   scoped names under `root/@scope/`. An occupied destination falls back to
//!   a numerically suffixed sibling.
//! - [`flatten_scoped_packages`] runs once every download has settled and
//!   hoists `root/@scope/<local>` to `root/@scope-<local>`.
//!
//! Normalization never fails as a whole: each filesystem operation that goes
//! wrong is logged and skipped.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::manifest::MANIFEST_FILE;
use crate::name::{FLATTEN_SEPARATOR, PackageName, SCOPE_PREFIX, flattened_dir_name};

/// Move an extracted package directory into the destination root
///
/// The package lands at `root/<name>` (`root/@scope/<local>` when scoped).
/// If that path is taken, the move is retried once at the suffixed path from
/// [`suffixed_destination`]. Returns the path the package ended up at.
pub fn place_package(src: &Path, root: &Path, name: &PackageName) -> Result<PathBuf> {
    let parent = match name.scope() {
        Some(scope) => root.join(scope),
        None => root.to_path_buf(),
    };
    std::fs::create_dir_all(&parent)?;

    let dest = parent.join(name.local());
    ensure_child(&parent, &dest)?;

    match move_without_overwrite(src, &dest) {
        Ok(()) => Ok(dest),
        Err(first) => {
            let fallback = suffixed_destination(&dest);
            tracing::debug!(
                package = %name,
                dest = %dest.display(),
                fallback = %fallback.display(),
                error = %first,
                "destination occupied, trying suffixed path"
            );

            ensure_child(&parent, &fallback)?;
            move_without_overwrite(src, &fallback).map_err(|e| CoreError::Placement {
                path: fallback.display().to_string(),
                message: e.to_string(),
            })?;
            Ok(fallback)
        }
    }
}

/// Compute the fallback path for an occupied destination
///
/// The last `-`-separated piece of the final path segment is read as a
/// version number (anything unparseable counts as 0) and the result is
/// `{dest}-{version + 1}`. A name that merely ends in digits is treated the
/// same way, so `foo-2` becomes `foo-2-3`.
#[must_use]
pub fn suffixed_destination(dest: &Path) -> PathBuf {
    let segment = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let version = segment
        .rsplit(FLATTEN_SEPARATOR)
        .next()
        .and_then(|tail| tail.parse::<u64>().ok())
        .unwrap_or(0);

    dest.with_file_name(format!("{}{}{}", segment, FLATTEN_SEPARATOR, version + 1))
}

/// Reject placement paths that are not a plain entry directly under `parent`
fn ensure_child(parent: &Path, path: &Path) -> Result<()> {
    let plain = matches!(
        path.components().next_back(),
        Some(std::path::Component::Normal(_))
    );
    if plain && path.parent() == Some(parent) {
        Ok(())
    } else {
        Err(CoreError::Placement {
            path: path.display().to_string(),
            message: format!("not a direct child of {}", parent.display()),
        })
    }
}

fn move_without_overwrite(src: &Path, dest: &Path) -> Result<()> {
    if dest.symlink_metadata().is_ok() {
        return Err(CoreError::DestinationExists {
            path: dest.display().to_string(),
        });
    }
    std::fs::rename(src, dest)?;
    Ok(())
}

/// Whether a top-level entry is a scope directory awaiting flattening
///
/// A flattened package such as `@scope-name` also starts with `@` but holds
/// its own `package.json`, which a scope directory never does.
pub fn is_scope_dir(path: &Path) -> bool {
    let starts_with_scope = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with(SCOPE_PREFIX))
        .unwrap_or(false);

    starts_with_scope && path.is_dir() && !path.join(MANIFEST_FILE).exists()
}

/// What a normalization pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Flattened directory names created or merged into
    pub flattened: Vec<String>,
    /// Scope directories removed
    pub removed_scopes: Vec<String>,
    /// Filesystem operations that failed and were skipped
    pub anomalies: usize,
}

/// Flatten every scope directory under `root`
pub fn flatten_scoped_packages(root: &Path) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    let entries = match list_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %root.display(), error = %e, "cannot list destination root");
            report.anomalies += 1;
            return report;
        }
    };

    for scope_path in entries.into_iter().filter(|p| is_scope_dir(p)) {
        let scope = dir_name(&scope_path);

        let packages = match list_dir(&scope_path) {
            Ok(packages) => packages,
            Err(e) => {
                tracing::warn!(path = %scope_path.display(), error = %e, "cannot list scope directory");
                report.anomalies += 1;
                Vec::new()
            }
        };

        for package_path in packages {
            if !package_path.is_dir() {
                tracing::warn!(path = %package_path.display(), "skipping non-directory in scope");
                report.anomalies += 1;
                continue;
            }

            let flat = flattened_dir_name(&scope, &dir_name(&package_path));
            report.anomalies += move_contents(&package_path, &root.join(&flat));
            report.flattened.push(flat);
        }

        match std::fs::remove_dir_all(&scope_path) {
            Ok(()) => report.removed_scopes.push(scope),
            Err(e) => {
                tracing::warn!(path = %scope_path.display(), error = %e, "cannot remove scope directory");
                report.anomalies += 1;
            }
        }
    }

    tracing::debug!(
        flattened = report.flattened.len(),
        scopes = report.removed_scopes.len(),
        anomalies = report.anomalies,
        "normalized destination layout"
    );

    report
}

/// Move each child of `from` into `to`, replacing what is already there
///
/// Returns the number of failed operations.
fn move_contents(from: &Path, to: &Path) -> usize {
    let children = match list_dir(from) {
        Ok(children) => children,
        Err(e) => {
            tracing::warn!(path = %from.display(), error = %e, "cannot list scoped package");
            return 1;
        }
    };

    if let Err(e) = std::fs::create_dir_all(to) {
        tracing::warn!(path = %to.display(), error = %e, "cannot create flattened directory");
        return 1;
    }

    let mut failures = 0;
    for child in children {
        let target = to.join(child.file_name().unwrap_or_default());

        if target.symlink_metadata().is_ok() {
            if let Err(e) = remove_path(&target) {
                tracing::warn!(path = %target.display(), error = %e, "cannot replace existing entry");
                failures += 1;
                continue;
            }
        }

        if let Err(e) = std::fs::rename(&child, &target) {
            tracing::warn!(
                from = %child.display(),
                to = %target.display(),
                error = %e,
                "cannot move scoped package entry"
            );
            failures += 1;
        }
    }

    failures
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() && !path.is_symlink() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

fn list_dir(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path)? {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

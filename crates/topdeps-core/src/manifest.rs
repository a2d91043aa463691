//! `package.json` reading
//!
//! Only the fields needed to place an extracted package are modelled; every
//! other key in the manifest is ignored.

use serde::Deserialize;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::name::PackageName;

/// File name of the package manifest inside an extracted tarball
pub const MANIFEST_FILE: &str = "package.json";

/// The subset of `package.json` topdeps cares about
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    /// Declared package name
    pub name: String,

    /// Declared version
    #[serde(default)]
    pub version: Option<String>,
}

impl PackageManifest {
    /// Parse a manifest from JSON text
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content)?;
        if manifest.name.trim().is_empty() {
            return Err(CoreError::InvalidManifest {
                message: "\"name\" is empty".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Load `package.json` from a package directory
    pub fn load(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| CoreError::InvalidManifest {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// Declared name as a [`PackageName`]
    pub fn package_name(&self) -> Result<PackageName> {
        PackageName::parse(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_manifest() {
        let manifest =
            PackageManifest::parse(r#"{"name": "@scope/pkg", "version": "1.2.3", "main": "index.js"}"#)
                .unwrap();
        assert_eq!(manifest.name, "@scope/pkg");
        assert_eq!(manifest.version.as_deref(), Some("1.2.3"));
        assert_eq!(manifest.package_name().unwrap().local(), "pkg");
    }

    #[test]
    fn test_parse_missing_name() {
        assert!(PackageManifest::parse(r#"{"version": "1.0.0"}"#).is_err());
        assert!(PackageManifest::parse(r#"{"name": "  "}"#).is_err());
    }

    #[test]
    fn test_load_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), r#"{"name": "lodash"}"#).unwrap();

        let manifest = PackageManifest::load(temp.path()).unwrap();
        assert_eq!(manifest.name, "lodash");
        assert!(manifest.version.is_none());
    }

    #[test]
    fn test_load_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let result = PackageManifest::load(temp.path());
        assert!(matches!(result, Err(CoreError::InvalidManifest { .. })));
    }
}

//! Archive download and placement
//!
//! [`ArchiveFetcher`] is the seam between the pipeline and the filesystem.
//! [`TarballFetcher`] downloads a tarball, unpacks it into a staging directory
//! inside the destination root, reads the declared name from `package.json`
//! and moves the package into place. It never retries.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use topdeps_core::{PackageManifest, extract_tarball, package_root, place_package};

use crate::error::Result;
use crate::http::HttpClient;

/// Prefix of the hidden staging directories created under the destination root
pub const STAGING_PREFIX: &str = ".topdeps-";

/// One archive to fetch into a destination root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
        }
    }
}

/// Downloads an archive and places its contents under a destination root
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch `task`, returning the directory the package was placed at
    async fn fetch(&self, task: &DownloadTask) -> Result<PathBuf>;
}

/// Fetches registry `.tgz` tarballs over HTTP
pub struct TarballFetcher {
    client: HttpClient,
}

impl TarballFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArchiveFetcher for TarballFetcher {
    async fn fetch(&self, task: &DownloadTask) -> Result<PathBuf> {
        let data = self.client.get_bytes(&task.url).await?;
        let dest = task.dest.clone();

        let placed = tokio::task::spawn_blocking(move || unpack_into(&data, &dest)).await??;
        Ok(placed)
    }
}

/// Unpack a tarball and place the package it contains under `root`
pub fn unpack_into(data: &[u8], root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;

    // Staging inside the root keeps the final move on one filesystem
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(root)?;

    extract_tarball(data, staging.path())?;
    let src = package_root(staging.path())?;
    let manifest = PackageManifest::load(&src)?;
    let name = manifest.package_name()?;

    let placed = place_package(&src, root, &name)?;
    tracing::debug!(package = %name, path = %placed.display(), "placed package");

    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn tarball(name: &str) -> Vec<u8> {
        let manifest = format!(r#"{{"name": "{}", "version": "1.0.0"}}"#, name);
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        for (path, content) in [
            ("package/package.json", manifest.as_bytes()),
            ("package/index.js", b"module.exports = 42;\n".as_slice()),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, content).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    fn visible_entries(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_unpack_plain_package() {
        let temp = TempDir::new().unwrap();
        let placed = unpack_into(&tarball("lodash"), temp.path()).unwrap();

        assert_eq!(placed, temp.path().join("lodash"));
        assert!(placed.join("index.js").exists());
        assert_eq!(visible_entries(temp.path()), vec!["lodash"]);
    }

    #[test]
    fn test_staging_dir_is_cleaned_up() {
        let temp = TempDir::new().unwrap();
        unpack_into(&tarball("ms"), temp.path()).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_unpack_scoped_package_nests() {
        let temp = TempDir::new().unwrap();
        let placed = unpack_into(&tarball("@types/node"), temp.path()).unwrap();
        assert_eq!(placed, temp.path().join("@types").join("node"));
    }

    #[test]
    fn test_second_copy_gets_suffix() {
        let temp = TempDir::new().unwrap();
        let first = unpack_into(&tarball("debug"), temp.path()).unwrap();
        let second = unpack_into(&tarball("debug"), temp.path()).unwrap();

        assert_eq!(first, temp.path().join("debug"));
        assert_eq!(second, temp.path().join("debug-1"));
    }

    #[test]
    fn test_unpack_refuses_names_outside_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("packages");

        for name in ["..", ".", "@scope/.."] {
            let err = unpack_into(&tarball(name), &root).unwrap_err();
            assert!(matches!(err, RegistryError::Core(_)), "{}: {:?}", name, err);
        }

        let mut beside: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        beside.sort();
        assert_eq!(beside, vec!["packages"]);
        assert!(visible_entries(&root).is_empty());
    }

    #[test]
    fn test_unpack_rejects_bad_archive() {
        let temp = TempDir::new().unwrap();
        let err = unpack_into(b"not a tarball", temp.path()).unwrap_err();
        assert!(matches!(err, RegistryError::Core(_)));
    }
}

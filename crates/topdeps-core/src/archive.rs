//! Tarball extraction
//!
//! Registry tarballs are gzip-compressed tar archives with a single top-level
//! directory (conventionally `package/`) holding the package contents.

use flate2::read::GzDecoder;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tar::Archive;

use crate::error::{CoreError, Result};

/// Extract a `.tgz` held in memory into `dest`
pub fn extract_tarball(data: &[u8], dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(Cursor::new(data));
    let mut archive = Archive::new(decoder);

    std::fs::create_dir_all(dest)?;

    archive.unpack(dest).map_err(|e| CoreError::Archive {
        message: format!("failed to unpack into {}: {}", dest.display(), e),
    })?;

    Ok(())
}

/// Locate the package root inside an extraction directory
///
/// Returns the first directory entry in name order. Tarballs that unpack
/// files directly at the top level are rejected.
pub fn package_root(extract_dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(extract_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    dirs.into_iter().next().ok_or_else(|| CoreError::Archive {
        message: format!("no package directory in {}", extract_dir.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    /// Build an in-memory `.tgz` from `(path, content)` pairs
    fn build_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);

        for (path, content) in files {
            let mut header = Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_extract_tarball() {
        let data = build_tarball(&[
            ("package/package.json", br#"{"name": "left-pad"}"#),
            ("package/index.js", b"module.exports = 1;\n"),
        ]);

        let temp = TempDir::new().unwrap();
        extract_tarball(&data, temp.path()).unwrap();

        assert!(temp.path().join("package/package.json").exists());
        assert!(temp.path().join("package/index.js").exists());
        assert_eq!(package_root(temp.path()).unwrap(), temp.path().join("package"));
    }

    #[test]
    fn test_extract_invalid_data() {
        let temp = TempDir::new().unwrap();
        let result = extract_tarball(b"definitely not gzip", temp.path());
        assert!(matches!(result, Err(CoreError::Archive { .. })));
    }

    #[test]
    fn test_package_root_nonstandard_dir() {
        let data = build_tarball(&[("node/package.json", br#"{"name": "x"}"#)]);

        let temp = TempDir::new().unwrap();
        extract_tarball(&data, temp.path()).unwrap();

        assert_eq!(package_root(temp.path()).unwrap(), temp.path().join("node"));
    }

    #[test]
    fn test_package_root_missing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("loose.txt"), "x").unwrap();
        assert!(package_root(temp.path()).is_err());
    }
}

//! Latest tarball resolution
//!
//! The registry metadata document maps dist-tags to versions and versions to
//! their tarball URLs. The URL is always found through the `latest` tag.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use topdeps_core::PackageName;

use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{RegistryError, Result};
use crate::http::HttpClient;
use crate::retry::Retrier;
use crate::stagger::Stagger;

/// Dist-tag that selects the version to download
pub const LATEST_TAG: &str = "latest";

/// Registry metadata document for one package
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    /// Tag name to version, e.g. `latest -> 4.17.21`
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,

    /// Published versions
    #[serde(default)]
    pub versions: HashMap<String, VersionEntry>,
}

/// One published version
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    #[serde(default)]
    pub dist: Option<Dist>,
}

/// Distribution info for a version
#[derive(Debug, Clone, Deserialize)]
pub struct Dist {
    pub tarball: String,
}

impl RegistryEntry {
    /// Parse a metadata document
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Version currently tagged `latest`
    pub fn latest_version(&self) -> Option<&str> {
        self.dist_tags.get(LATEST_TAG).map(String::as_str)
    }

    /// Tarball URL of a specific version
    pub fn tarball(&self, version: &str) -> Option<&str> {
        self.versions
            .get(version)
            .and_then(|v| v.dist.as_ref())
            .map(|d| d.tarball.as_str())
    }
}

/// A package whose latest tarball URL is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: String,
    pub tarball_url: String,
}

impl ResolvedPackage {
    /// Resolve the `latest` tarball from a metadata document
    pub fn from_entry(name: &PackageName, entry: &RegistryEntry) -> Result<Self> {
        let version = entry
            .latest_version()
            .ok_or_else(|| RegistryError::MalformedEntry {
                name: name.to_string(),
                message: format!("no \"{}\" dist-tag", LATEST_TAG),
            })?;

        let tarball_url = entry
            .tarball(version)
            .ok_or_else(|| RegistryError::MalformedEntry {
                name: name.to_string(),
                message: format!("no tarball for version {}", version),
            })?;

        Ok(Self {
            name: name.clone(),
            version: version.to_string(),
            tarball_url: tarball_url.to_string(),
        })
    }
}

/// Looks up latest tarball URLs through the retry and stagger layers
pub struct UrlResolver {
    client: HttpClient,
    settings: Settings,
    retrier: Retrier,
    stagger: Stagger,
}

impl UrlResolver {
    pub fn new(client: HttpClient, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            retrier: Retrier::new(settings.metadata_retry, Arc::clone(&clock)),
            stagger: Stagger::new(settings.metadata_stagger, clock),
            settings,
        }
    }

    /// Resolve one package
    pub async fn resolve(&self, name: &PackageName) -> Result<ResolvedPackage> {
        let url = self.settings.metadata_url(name);
        let key = name.to_string();

        let bytes = self
            .retrier
            .run_checked(&key, |_| self.client.get_bytes(&url))
            .await?;

        let entry = RegistryEntry::from_slice(&bytes).map_err(|e| RegistryError::MalformedEntry {
            name: key.clone(),
            message: e.to_string(),
        })?;

        let resolved = ResolvedPackage::from_entry(name, &entry)?;
        tracing::debug!(
            package = %name,
            version = %resolved.version,
            url = %resolved.tarball_url,
            "resolved latest tarball"
        );
        Ok(resolved)
    }

    /// Resolve every name, staggered by index; results are in input order
    pub async fn resolve_all(&self, names: &[PackageName]) -> Vec<Result<ResolvedPackage>> {
        let total = names.len();
        tracing::info!(packages = total, "resolving latest tarballs");

        self.stagger
            .run(names, |index, name| async move {
                tracing::debug!(package = %name, index = index + 1, total, "looking up metadata");
                self.resolve(name).await
            })
            .await
    }
}

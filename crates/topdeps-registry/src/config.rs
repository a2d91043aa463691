//! Run settings
//!
//! Stored in `~/.config/topdeps/config.yaml`. Every key is optional; missing
//! keys fall back to the defaults for the public npm registry.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use topdeps_core::PackageName;

use crate::error::{RegistryError, Result};
use crate::retry::RetryPolicy;

/// Settings for one download run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Paginated "most depended upon" listing, queried with `?offset=`
    pub listing_url: String,

    /// Registry metadata endpoint base
    pub registry_url: String,

    /// Names per listing page
    pub page_size: usize,

    /// One extra listing page is fetched per this many requested packages
    pub extra_page_divisor: usize,

    /// CSS selector matching one element per listed package name
    pub name_selector: String,

    /// Retry budget for listing pages
    pub listing_retry: RetryPolicy,

    /// Launch interval between listing pages
    #[serde(with = "humantime_serde")]
    pub listing_stagger: Duration,

    /// Retry budget for metadata lookups
    pub metadata_retry: RetryPolicy,

    /// Launch interval between metadata lookups
    #[serde(with = "humantime_serde")]
    pub metadata_stagger: Duration,

    /// Launch interval between tarball downloads
    #[serde(with = "humantime_serde")]
    pub download_stagger: Duration,

    /// HTTP client settings
    pub http: HttpSettings,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("topdeps/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listing_url: "https://www.npmjs.com/browse/depended".to_string(),
            registry_url: "https://registry.npmjs.org".to_string(),
            page_size: 36,
            extra_page_divisor: 1000,
            name_selector: ".name".to_string(),
            listing_retry: RetryPolicy::new(10, Duration::from_secs(3)),
            listing_stagger: Duration::from_secs(2),
            metadata_retry: RetryPolicy::new(10, Duration::from_millis(500)),
            metadata_stagger: Duration::from_millis(100),
            download_stagger: Duration::from_millis(100),
            http: HttpSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get default settings path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RegistryError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("topdeps").join("config.yaml"))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(RegistryError::InvalidConfig {
                message: "pageSize must be greater than 0".to_string(),
            });
        }
        if self.extra_page_divisor == 0 {
            return Err(RegistryError::InvalidConfig {
                message: "extraPageDivisor must be greater than 0".to_string(),
            });
        }
        if self.listing_retry.max_attempts == 0 || self.metadata_retry.max_attempts == 0 {
            return Err(RegistryError::InvalidConfig {
                message: "maxAttempts must be greater than 0".to_string(),
            });
        }
        if self.name_selector.trim().is_empty() {
            return Err(RegistryError::InvalidConfig {
                message: "nameSelector must not be empty".to_string(),
            });
        }

        for url in [&self.listing_url, &self.registry_url] {
            let parsed = Url::parse(url).map_err(|e| RegistryError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RegistryError::InvalidUrl {
                    url: url.clone(),
                    reason: "URL must start with http:// or https://".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Listing page URL for an offset
    pub fn page_url(&self, offset: usize) -> String {
        let separator = if self.listing_url.contains('?') { '&' } else { '?' };
        format!("{}{}offset={}", self.listing_url, separator, offset)
    }

    /// Metadata URL for a package, with the scope separator percent-encoded
    pub fn metadata_url(&self, name: &PackageName) -> String {
        format!(
            "{}/{}",
            self.registry_url.trim_end_matches('/'),
            name.encoded()
        )
    }
}

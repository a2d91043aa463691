//! Error types for listing, registry and download operations

use thiserror::Error;

/// Registry operation errors
#[derive(Debug, Error)]
pub enum RegistryError {
    // ============ Configuration Errors ============
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited by server. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    // ============ Retry Errors ============
    #[error("Gave up on {key} after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        key: String,
        attempts: u32,
        last_error: String,
    },

    // ============ Registry Errors ============
    #[error("Malformed registry entry for {name}: {message}")]
    MalformedEntry { name: String, message: String },

    // ============ Package Errors ============
    #[error(transparent)]
    Core(#[from] topdeps_core::CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Other ============
    #[error("{0}")]
    Other(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RegistryError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            RegistryError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RegistryError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RegistryError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RegistryError {
    fn from(e: serde_yaml::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(e: url::ParseError) -> Self {
        RegistryError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for RegistryError {
    fn from(e: tokio::task::JoinError) -> Self {
        RegistryError::Other(format!("Background task failed: {}", e))
    }
}

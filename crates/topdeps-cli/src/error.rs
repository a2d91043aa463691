//! CLI error types with exit code handling

use miette::Diagnostic;
use thiserror::Error;

use topdeps_core::CoreError;
use topdeps_registry::RegistryError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(topdeps::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid command-line input
    #[error("Invalid input: {message}")]
    #[diagnostic(code(topdeps::cli::input))]
    Input { message: String },

    /// Destination checks failed
    #[error("Verification failed: {failed} of {total} check(s) failed")]
    #[diagnostic(code(topdeps::cli::verify))]
    VerifyFailed { failed: usize, total: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(topdeps::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(topdeps::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Input { .. } => exit_codes::ERROR,
            CliError::VerifyFailed { .. } => exit_codes::VERIFY_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => CliError::from(e),
            CoreError::InvalidName { .. } => CliError::input(err.to_string()),
            other => CliError::internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidConfig { .. }
            | RegistryError::InvalidUrl { .. }
            | RegistryError::Serialization(_) => CliError::Config {
                message: err.to_string(),
                help: None,
            },
            RegistryError::Io(e) => CliError::from(e),
            RegistryError::Core(e) => CliError::from(e),
            other => CliError::internal(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::VerifyFailed { failed: 1, total: 3 }.exit_code(),
            exit_codes::VERIFY_ERROR
        );
        assert_eq!(CliError::input("bad").exit_code(), exit_codes::ERROR);
        assert_eq!(
            CliError::config_with_help("bad", "fix it").exit_code(),
            exit_codes::CONFIG_ERROR
        );
    }

    #[test]
    fn test_registry_config_error_maps_to_config() {
        let err = CliError::from(RegistryError::InvalidConfig {
            message: "pageSize must be greater than 0".to_string(),
        });
        assert!(matches!(err, CliError::Config { .. }));
        assert!(err.to_string().contains("pageSize"));
    }

    #[test]
    fn test_io_error_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(
            CliError::from(RegistryError::Io(io)).exit_code(),
            exit_codes::IO_ERROR
        );
    }
}

//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid package name: {name}")]
    InvalidName { name: String },

    #[error("Invalid package.json: {message}")]
    InvalidManifest { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: String },

    #[error("Failed to place package at {path}: {message}")]
    Placement { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

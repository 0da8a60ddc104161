//! Error types for the medlog_core library.

use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Medicine is not in the registry
    #[error("The medicine {0:?} is not registered.")]
    NotFound(String),

    /// Registry directory is missing
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),

    /// Another medicine already occupies the storage key
    #[error("Registry conflict: {0}")]
    Conflict(String),

    /// A dose log line does not match the line format
    #[error("Malformed log line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// A medicine record or typed value does not match its format
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Input rejected before reaching the core logic
    #[error("Validation error: {0}")]
    Validation(String),
}

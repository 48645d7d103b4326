//! Error types for gitsvc

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for gitsvc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Document format a file was parsed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFormat {
    Json,
    Yaml,
}

impl std::fmt::Display for ParseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFormat::Json => f.write_str("JSON"),
            ParseFormat::Yaml => f.write_str("YAML"),
        }
    }
}

/// Error type for gitsvc operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configured credential cannot be used (e.g. unreadable SSH key)
    #[error("Authentication configuration error: {0}")]
    AuthConfig(String),

    /// Initial clone failed
    #[error("Clone failed: {0}")]
    Clone(String),

    /// Pulling from the remote failed
    #[error("Sync failed: {0}")]
    Sync(String),

    /// HEAD or its commit could not be resolved
    #[error("Commit metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// Requested file is not in the working copy
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File has a recognised extension but malformed contents
    #[error("Failed to parse {format} in {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: ParseFormat,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

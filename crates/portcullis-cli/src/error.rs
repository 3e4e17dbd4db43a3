//! Error types for the Portcullis CLI

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file read error
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Input file read error
    #[error("Failed to read {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file parse error
    #[error("Failed to parse {path}: {message}")]
    InputParse { path: PathBuf, message: String },

    /// Input file with an unrecognized extension
    #[error("Unsupported file type: {path}. Use .json, .toml, .yaml or .yml")]
    UnsupportedFormat { path: PathBuf },

    /// File write error
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mapping, codec or backend error
    #[error(transparent)]
    Portcullis(#[from] portcullis::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an input parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::InputParse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

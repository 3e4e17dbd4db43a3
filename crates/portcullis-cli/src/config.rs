//! Configuration parsing for portcullis.toml
//!
//! ```toml
//! [logging]
//! filter = "portcullis=debug"
//! format = "json"          # pretty, json or compact
//!
//! [output]
//! json = true              # JSON output by default
//! ```
//!
//! Every section is optional and a missing file means all defaults.

use serde::Deserialize;
use std::path::Path;

use portcullis::observability::{LogFormat, ObservabilityConfig};

use crate::error::{CliError, Result};

/// Root configuration structure for portcullis.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortcullisConfig {
    /// Logging overrides
    pub logging: LoggingConfig,

    /// Output defaults
    pub output: OutputConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, as in `RUST_LOG`
    pub filter: Option<String>,

    /// Output format
    pub format: Option<LogFormat>,
}

/// `[output]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Print JSON instead of text where a command supports both
    pub json: bool,
}

impl PortcullisConfig {
    /// Load configuration from a file path; a missing file yields defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_str(&content, path)
    }

    /// Parse configuration from a string
    pub fn from_str(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Logging configuration: environment, then this file, then `--verbose`
    pub fn observability(&self, verbose: bool) -> ObservabilityConfig {
        let mut config = ObservabilityConfig::from_env();
        if let Some(filter) = &self.logging.filter {
            config.log_filter = filter.clone();
        }
        if let Some(format) = self.logging.format {
            config.log_format = format;
        }
        if verbose {
            config.log_filter = "portcullis=debug,info".to_string();
        }
        config
    }
}

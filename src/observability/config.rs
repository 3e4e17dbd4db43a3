//! Observability Configuration
//!
//! Defines the logging configuration applied at startup.

use std::env;

use serde::Deserialize;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// JSON format for log aggregation
    Json,
    /// Compact single-line format
    #[default]
    Compact,
}

impl LogFormat {
    /// Parse a format name; `None` for unknown names
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Complete observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Log level filter (e.g., "warn", "portcullis=debug")
    pub log_filter: String,
    /// Include source file and line in events
    pub with_source_location: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "warn".to_string(),
            with_source_location: false,
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LOG_FORMAT`: "pretty", "json", or "compact" (default: "compact")
    /// - `RUST_LOG`: Log filter directive (default: "warn")
    /// - `LOG_SOURCE_LOCATION`: Include file and line (default: "false")
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let log_format = env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or(defaults.log_format);

        let log_filter = env::var("RUST_LOG").unwrap_or(defaults.log_filter);

        let with_source_location = env::var("LOG_SOURCE_LOCATION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.with_source_location);

        Self {
            log_format,
            log_filter,
            with_source_location,
        }
    }

    /// Create a new configuration builder
    pub fn builder() -> ObservabilityConfigBuilder {
        ObservabilityConfigBuilder::default()
    }
}

/// Builder for ObservabilityConfig
#[derive(Default)]
pub struct ObservabilityConfigBuilder {
    config: ObservabilityConfig,
}

impl ObservabilityConfigBuilder {
    /// Set the log format
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    /// Set the log filter
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Include or omit source file and line
    pub fn with_source_location(mut self, enable: bool) -> Self {
        self.config.with_source_location = enable;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ObservabilityConfig {
        self.config
    }
}

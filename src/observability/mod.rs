//! Logging Infrastructure
//!
//! Library code emits events with the standard `tracing` macros and never
//! installs a subscriber itself. Binaries call [`init`] once at startup.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::observability::{init, LogFormat, ObservabilityConfig};
//!
//! // From environment variables
//! init(&ObservabilityConfig::from_env())?;
//!
//! // Or programmatically
//! let config = ObservabilityConfig::builder()
//!     .log_format(LogFormat::Json)
//!     .log_filter("portcullis=debug")
//!     .build();
//! init(&config)?;
//! ```

mod config;
mod providers;

pub use config::{LogFormat, ObservabilityConfig, ObservabilityConfigBuilder};
pub use providers::{build_filter, init_tracing};

use tracing::debug;

/// Initialize logging.
///
/// Must be called at most once per process, before any events are emitted.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    providers::init_tracing(config)?;

    debug!(
        log_format = ?config.log_format,
        log_filter = %config.log_filter,
        "Logging initialized"
    );

    Ok(())
}

/// Observability initialization errors
#[derive(Debug)]
pub enum ObservabilityError {
    /// Invalid configuration
    Config(String),
    /// Subscriber installation failed
    Provider(String),
}

impl std::fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Observability config error: {}", msg),
            Self::Provider(msg) => write!(f, "Provider error: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}

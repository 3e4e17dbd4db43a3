//! Error types for flat-map addressing and policy mapping
//!
//! Every failure here is a local validation failure: it is raised before any
//! collaborator is called and leaves no partial state behind.

use thiserror::Error;

use crate::value::Value;

/// Field label used in errors about the configuration root itself
pub const ROOT_FIELD: &str = "<root>";

/// Result type alias for portcullis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the codec, the mappers and the resource layer
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value does not have the shape a field requires
    #[error("Invalid type for {field}: expected {expected}, found {found}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// Text does not name one of the recognized enumeration values
    #[error("Invalid value for {field}: {value:?} (valid options: {allowed})")]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: &'static str,
    },

    /// A flat map cannot be decoded back into a tree
    #[error("Malformed flatmap at {key:?}: {message}")]
    MalformedFlatmap { key: String, message: String },

    /// A map key cannot be addressed by a flat path without ambiguity
    #[error("Map key {key:?} at {path:?} cannot be flattened: {reason}")]
    UnaddressableKey {
        path: String,
        key: String,
        reason: &'static str,
    },

    /// A required field is absent
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// The policy or user backend rejected an operation
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// JSON (de)serialization error on the wire model
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a type mismatch error for `field` holding `found`
    ///
    /// An empty field path names the configuration root and is reported as
    /// [`ROOT_FIELD`].
    pub fn field_type(field: impl Into<String>, expected: &'static str, found: &Value) -> Self {
        let field = field.into();
        Self::InvalidFieldType {
            field: if field.is_empty() { ROOT_FIELD.to_string() } else { field },
            expected,
            found: found.describe(),
        }
    }

    /// Create an unrecognized enumeration value error
    pub fn enum_value(
        field: impl Into<String>,
        value: impl Into<String>,
        allowed: &'static str,
    ) -> Self {
        Self::InvalidEnumValue {
            field: field.into(),
            value: value.into(),
            allowed,
        }
    }

    /// Create a malformed flat map error
    pub fn malformed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFlatmap {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a missing required field error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a backend failure error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

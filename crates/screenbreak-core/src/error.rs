//! Core error types for screenbreak-core.
//!
//! This module defines the error hierarchy using thiserror. Poll failures
//! are not surfaced to the user (see [`crate::intervention::poller`]), but
//! every other caller sees these values.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for screenbreak-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Transport-level failure (connect, TLS, protocol)
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// No complete response within the request timeout
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Server answered with a non-success status
    #[error("Server returned HTTP {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home directory could not be resolved
    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Numeric value outside its accepted range
    #[error("'{field}' must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: String,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl CoreError {
    pub(crate) fn http(endpoint: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return CoreError::Timeout {
                endpoint: endpoint.to_string(),
            };
        }
        CoreError::Http {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }

    pub(crate) fn decode(endpoint: &str, message: impl Into<String>) -> Self {
        CoreError::Decode {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

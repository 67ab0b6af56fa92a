//! Layered error definitions
//!
//! Categorized by source: config / transport / record / storage

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// The platform binding refused to start discovery/connection
    #[error("{peripheral} transport error: {message}")]
    Transport { peripheral: String, message: String },

    // ===== Record Errors =====
    /// A buffer that should hold exactly one record has the wrong length
    #[error("record must be exactly {expected} bytes, got {actual}")]
    RecordLength { expected: usize, actual: usize },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(peripheral: impl ToString, message: impl Into<String>) -> Self {
        Self::Transport {
            peripheral: peripheral.to_string(),
            message: message.into(),
        }
    }
}

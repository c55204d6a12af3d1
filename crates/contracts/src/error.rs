//! Layered error definitions
//!
//! Categorized by source: config / boundary / source / io

use thiserror::Error;

/// Unified error type for contract-level operations
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

    // ===== Boundary Errors =====
    /// The boundary answered with a non-success status
    #[error("boundary rejected '{operation}' with status {status}: {body}")]
    BoundaryRejected {
        operation: String,
        status: u16,
        body: String,
    },

    /// The boundary could not be reached or answered garbage
    #[error("boundary transport error during '{operation}': {message}")]
    BoundaryTransport { operation: String, message: String },

    // ===== Change Source Errors =====
    /// A change source could not start listening
    #[error("change source '{source_name}' failed: {message}")]
    ChangeSource {
        source_name: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
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

    /// Create boundary rejection error
    pub fn boundary_rejected(
        operation: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::BoundaryRejected {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Create boundary transport error
    pub fn boundary_transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BoundaryTransport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create change source error
    pub fn change_source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChangeSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

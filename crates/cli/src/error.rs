//! Error types for CLI operations.

use std::path::PathBuf;

use contracts::RunId;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file for `run` does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The foreground run did not succeed
    #[error("Run {run_id} finished with status {status}: {message}")]
    RunFailed {
        run_id: RunId,
        status: String,
        message: String,
    },

    /// A run record went missing after execution
    #[error("Run {run_id} not found")]
    RunNotFound { run_id: RunId },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },
}

impl CliError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn run_failed(run_id: RunId, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RunFailed {
            run_id,
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}

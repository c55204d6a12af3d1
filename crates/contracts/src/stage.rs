//! Stages trait - the three opaque pipeline stage functions
//!
//! Stage bodies are external collaborators. Only their input/output shape is
//! load-bearing for the executor. Calls may block for a long time; the
//! executor runs them on the blocking pool.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Metrics;

/// File name the score stage writes its serialized metrics to
pub const METRICS_FILE: &str = "metrics.json";

/// Failure raised by a stage function
#[derive(Debug, Error)]
pub enum StageError {
    /// The input data cannot be used by this stage
    #[error("{0}")]
    InvalidInput(String),

    /// Input format not handled by this stage implementation
    #[error("unsupported input '{path}': {reason}")]
    Unsupported { path: String, reason: String },

    /// Unknown processing variant
    #[error("unknown model variant '{0}'")]
    UnknownVariant(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, with an optional underlying cause
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StageError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an unsupported input error
    pub fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap a foreign error with context
    pub fn other(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Stage Result type alias
pub type StageResult<T> = std::result::Result<T, StageError>;

/// The pipeline stage functions
///
/// | Stage   | Inputs                               | Output              |
/// |---------|--------------------------------------|---------------------|
/// | prepare | source path, output dir              | processed-data path |
/// | fit     | processed path, output dir, variant  | trained-model path  |
/// | score   | processed path, model path, out dir  | metrics map         |
pub trait Stages: Send + Sync {
    /// Normalize the source file into a processed dataset.
    ///
    /// Must be deterministic for identical input.
    fn prepare(&self, source: &Path, out_dir: &Path) -> StageResult<PathBuf>;

    /// Train a model of the given variant on the processed data.
    fn fit(&self, processed: &Path, out_dir: &Path, variant: &str) -> StageResult<PathBuf>;

    /// Score the model and return its metrics.
    ///
    /// Implementations also write the metrics as JSON to
    /// `out_dir/`[`METRICS_FILE`].
    fn score(&self, processed: &Path, model: &Path, out_dir: &Path) -> StageResult<Metrics>;
}

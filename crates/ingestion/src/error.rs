//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion errors
///
/// Only startup can fail; per-candidate problems become a
/// [`crate::CandidateOutcome`] instead.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The watch root could not be created
    #[error("failed to prepare watch root {path}: {source}")]
    WatchRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The change source refused to start
    #[error(transparent)]
    ChangeSource(#[from] ContractError),

    /// Fingerprint or metadata read failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    pub fn watch_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WatchRoot {
            path: path.into(),
            source,
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;

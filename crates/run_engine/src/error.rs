//! Run engine error types

use contracts::{RunId, StoreError};
use thiserror::Error;

/// Run engine errors
///
/// Stage failures are not errors here: they are recorded on the run and
/// reported through [`crate::ExecutionOutcome`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record vanished while the run was executing
    #[error("run {0} disappeared during execution")]
    RunVanished(RunId),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

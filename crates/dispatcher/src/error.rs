//! Dispatcher error types

use contracts::RunId;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The run queue has been closed by shutdown
    #[error("run queue closed, run {run_id} not enqueued")]
    QueueClosed { run_id: RunId },

    /// Execution failed outside of a stage
    #[error("engine error: {0}")]
    Engine(#[from] run_engine::EngineError),
}

//! # Run Engine
//!
//! The run/step state machine and everything needed to drive a run through
//! the three pipeline stages.
//!
//! - [`MemoryRunStore`]: process-local [`contracts::RunStore`]
//! - [`RunLog`]: per-run append-only text log with tail reads
//! - [`RunWorkspace`]: per-run output directories
//! - [`PipelineExecutor`]: sequential stage execution with failure capture
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(MemoryRunStore::new());
//! let executor = PipelineExecutor::new(store.clone(), Arc::new(BaselineStages), data_root);
//! let outcome = executor.execute(run_id).await?;
//! ```

mod error;
mod executor;
mod log_store;
mod memory_store;
mod workspace;

pub use error::EngineError;
pub use executor::{ExecutionOutcome, PipelineExecutor};
pub use log_store::{
    clamp_tail_lines, RunLog, DEFAULT_TAIL_LINES, MAX_TAIL_LINES, MIN_TAIL_LINES,
};
pub use memory_store::MemoryRunStore;
pub use workspace::{highest_used_run_id, RunWorkspace};

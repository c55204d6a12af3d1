//! RunStore trait - record storage contract
//!
//! The storage technology is out of scope; this trait lists exactly the
//! operations the run engine, dispatcher and boundaries need. Not-found is
//! `Ok(None)`, never an error.

use thiserror::Error;

use crate::{
    Artifacts, Dataset, DatasetId, DatasetMeta, Metrics, Run, RunId, RunStatus, StageName,
    StepStatus,
};

/// Store failures. Missing records are not failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Run status change outside the legal table
    #[error("illegal run transition for run {run_id}: {from} -> {to}")]
    IllegalRunTransition {
        run_id: RunId,
        from: RunStatus,
        to: RunStatus,
    },

    /// Step status change outside the legal table
    #[error("illegal step transition for run {run_id} step '{stage}': {from} -> {to}")]
    IllegalStepTransition {
        run_id: RunId,
        stage: StageName,
        from: StepStatus,
        to: StepStatus,
    },

    /// Backend failure (lock poisoning, I/O, ...)
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Store Result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Registration request for a new dataset
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub name: String,
    pub source_path: String,
    pub meta: DatasetMeta,
}

/// Storage contract for datasets, runs and steps.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn RunStore>`,
/// and must apply each call atomically: a run is never observable without its
/// three steps.
pub trait RunStore: Send + Sync {
    /// Insert a dataset record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on storage failure.
    fn create_dataset(&self, dataset: NewDataset) -> StoreResult<Dataset>;

    /// Fetch a dataset by id.
    fn get_dataset(&self, id: DatasetId) -> StoreResult<Option<Dataset>>;

    /// List datasets, newest first.
    fn list_datasets(&self, limit: usize) -> StoreResult<Vec<Dataset>>;

    /// Insert a `queued` run with `pending` prepare/fit/score steps.
    ///
    /// Returns `Ok(None)` when the dataset does not exist.
    fn create_run(&self, dataset_id: DatasetId, model_type: &str) -> StoreResult<Option<Run>>;

    /// Fetch a run (with its steps) by id.
    fn get_run(&self, id: RunId) -> StoreResult<Option<Run>>;

    /// List runs, newest first.
    fn list_runs(&self, limit: usize) -> StoreResult<Vec<Run>>;

    /// List runs currently in `status`, oldest first.
    fn list_runs_by_status(&self, status: RunStatus) -> StoreResult<Vec<Run>>;

    /// Move a run to `status`.
    ///
    /// Sets `started_at` on entry to `running`, `finished_at` on entry to a
    /// terminal status, and `error` only when provided.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IllegalRunTransition`] for backward or repeated
    /// transitions; the record is left untouched.
    fn transition_run(
        &self,
        id: RunId,
        status: RunStatus,
        error: Option<&str>,
    ) -> StoreResult<Option<Run>>;

    /// Move one step of a run to `status`, optionally setting its message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IllegalStepTransition`] for backward or repeated
    /// transitions; the record is left untouched.
    fn transition_step(
        &self,
        id: RunId,
        stage: StageName,
        status: StepStatus,
        message: Option<&str>,
    ) -> StoreResult<Option<Run>>;

    /// Shallow-merge artifacts and/or metrics into the run. `None` leaves the
    /// corresponding map untouched.
    fn merge_run_outputs(
        &self,
        id: RunId,
        artifacts: Option<&Artifacts>,
        metrics: Option<&Metrics>,
    ) -> StoreResult<Option<Run>>;

    /// Delete a run and its steps. Returns whether a run was removed.
    fn delete_run(&self, id: RunId) -> StoreResult<bool>;
}

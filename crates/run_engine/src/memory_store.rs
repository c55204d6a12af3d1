//! In-memory [`RunStore`]
//!
//! All records live behind one mutex so every operation, including the
//! run-plus-steps insert, is atomic.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use contracts::{
    Artifacts, Dataset, DatasetId, Metrics, NewDataset, Run, RunId, RunStatus, RunStep, RunStore,
    StageName, StepId, StepStatus, StoreError, StoreResult,
};
use tracing::debug;

use crate::workspace::highest_used_run_id;

#[derive(Debug, Default)]
struct Inner {
    last_dataset_id: u64,
    last_run_id: u64,
    last_step_id: u64,
    datasets: BTreeMap<DatasetId, Dataset>,
    runs: BTreeMap<RunId, Run>,
}

/// Process-local run store
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    inner: Mutex<Inner>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store whose run ids continue after the runs already on disk,
    /// so a restarted process never appends to an earlier run's log or
    /// workspace
    pub fn for_data_root(data_root: &Path) -> io::Result<Self> {
        let store = Self::default();
        if let Some(RunId(last)) = highest_used_run_id(data_root)? {
            if let Ok(mut inner) = store.inner.lock() {
                inner.last_run_id = last;
            }
            debug!(last_run_id = last, "run ids resume after existing runs");
        }
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl RunStore for MemoryRunStore {
    fn create_dataset(&self, dataset: NewDataset) -> StoreResult<Dataset> {
        let mut inner = self.lock()?;
        inner.last_dataset_id += 1;
        let record = Dataset {
            id: DatasetId(inner.last_dataset_id),
            name: dataset.name,
            source_path: dataset.source_path,
            meta: dataset.meta,
            created_at: Utc::now(),
        };
        inner.datasets.insert(record.id, record.clone());
        debug!(dataset_id = %record.id, name = %record.name, "dataset created");
        Ok(record)
    }

    fn get_dataset(&self, id: DatasetId) -> StoreResult<Option<Dataset>> {
        Ok(self.lock()?.datasets.get(&id).cloned())
    }

    fn list_datasets(&self, limit: usize) -> StoreResult<Vec<Dataset>> {
        Ok(self
            .lock()?
            .datasets
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn create_run(&self, dataset_id: DatasetId, model_type: &str) -> StoreResult<Option<Run>> {
        let mut inner = self.lock()?;
        if !inner.datasets.contains_key(&dataset_id) {
            return Ok(None);
        }

        inner.last_run_id += 1;
        let run_id = RunId(inner.last_run_id);
        let mut steps = Vec::with_capacity(StageName::ALL.len());
        for stage in StageName::ALL {
            inner.last_step_id += 1;
            steps.push(RunStep {
                id: StepId(inner.last_step_id),
                run_id,
                name: stage,
                status: StepStatus::Pending,
                started_at: None,
                finished_at: None,
                message: None,
            });
        }

        let run = Run {
            id: run_id,
            dataset_id,
            model_type: model_type.to_string(),
            status: RunStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            artifacts: Artifacts::new(),
            metrics: Metrics::new(),
            error: None,
            steps,
        };
        inner.runs.insert(run_id, run.clone());
        debug!(run_id = %run_id, dataset_id = %dataset_id, model_type, "run created");
        Ok(Some(run))
    }

    fn get_run(&self, id: RunId) -> StoreResult<Option<Run>> {
        Ok(self.lock()?.runs.get(&id).cloned())
    }

    fn list_runs(&self, limit: usize) -> StoreResult<Vec<Run>> {
        Ok(self
            .lock()?
            .runs
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_runs_by_status(&self, status: RunStatus) -> StoreResult<Vec<Run>> {
        Ok(self
            .lock()?
            .runs
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    fn transition_run(
        &self,
        id: RunId,
        status: RunStatus,
        error: Option<&str>,
    ) -> StoreResult<Option<Run>> {
        let mut inner = self.lock()?;
        let Some(run) = inner.runs.get_mut(&id) else {
            return Ok(None);
        };
        if !run.status.can_transition_to(status) {
            return Err(StoreError::IllegalRunTransition {
                run_id: id,
                from: run.status,
                to: status,
            });
        }

        let now = Utc::now();
        run.status = status;
        if status == RunStatus::Running && run.started_at.is_none() {
            run.started_at = Some(now);
        }
        if status.is_terminal() && run.finished_at.is_none() {
            run.finished_at = Some(now);
        }
        if let Some(error) = error {
            run.error = Some(error.to_string());
        }
        Ok(Some(run.clone()))
    }

    fn transition_step(
        &self,
        id: RunId,
        stage: StageName,
        status: StepStatus,
        message: Option<&str>,
    ) -> StoreResult<Option<Run>> {
        let mut inner = self.lock()?;
        let Some(run) = inner.runs.get_mut(&id) else {
            return Ok(None);
        };
        let Some(step) = run.steps.iter_mut().find(|s| s.name == stage) else {
            return Ok(None);
        };
        if !step.status.can_transition_to(status) {
            return Err(StoreError::IllegalStepTransition {
                run_id: id,
                stage,
                from: step.status,
                to: status,
            });
        }

        let now = Utc::now();
        step.status = status;
        if status == StepStatus::Running && step.started_at.is_none() {
            step.started_at = Some(now);
        }
        if status.is_terminal() && step.finished_at.is_none() {
            step.finished_at = Some(now);
        }
        if let Some(message) = message {
            step.message = Some(message.to_string());
        }
        Ok(Some(run.clone()))
    }

    fn merge_run_outputs(
        &self,
        id: RunId,
        artifacts: Option<&Artifacts>,
        metrics: Option<&Metrics>,
    ) -> StoreResult<Option<Run>> {
        let mut inner = self.lock()?;
        let Some(run) = inner.runs.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(artifacts) = artifacts {
            run.artifacts
                .extend(artifacts.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(metrics) = metrics {
            run.metrics
                .extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        }
        Ok(Some(run.clone()))
    }

    fn delete_run(&self, id: RunId) -> StoreResult<bool> {
        Ok(self.lock()?.runs.remove(&id).is_some())
    }
}

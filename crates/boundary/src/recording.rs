//! RecordingBoundary - records every call, for tests and dry runs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use contracts::{
    ContractError, CreatedRun, DatasetId, DatasetRegistration, IngestBoundary, RegisteredDataset,
    RunId, RunRequest,
};

use crate::http::{OP_CREATE_RUN, OP_REGISTER_DATASET};

/// Boundary that accepts everything (unless told to fail) and keeps a copy of
/// each request
#[derive(Debug, Default)]
pub struct RecordingBoundary {
    registrations: Mutex<Vec<DatasetRegistration>>,
    run_requests: Mutex<Vec<RunRequest>>,
    next_dataset: AtomicU64,
    next_run: AtomicU64,
    fail_register: AtomicBool,
    fail_create_run: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every registration with status 500
    pub fn fail_registrations(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::Relaxed);
    }

    /// Reject every run creation with status 500
    pub fn fail_run_creation(&self, fail: bool) {
        self.fail_create_run.store(fail, Ordering::Relaxed);
    }

    /// Sleep before answering each registration
    pub fn set_delay(&self, delay: Duration) {
        if let Ok(mut d) = self.delay.lock() {
            *d = Some(delay);
        }
    }

    pub fn registrations(&self) -> Vec<DatasetRegistration> {
        self.registrations
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn run_requests(&self) -> Vec<RunRequest> {
        self.run_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn delay(&self) -> Option<Duration> {
        self.delay.lock().ok().and_then(|d| *d)
    }
}

impl IngestBoundary for RecordingBoundary {
    fn name(&self) -> &str {
        "recording"
    }

    async fn register_dataset(
        &self,
        request: &DatasetRegistration,
    ) -> Result<RegisteredDataset, ContractError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_register.load(Ordering::Relaxed) {
            return Err(ContractError::boundary_rejected(
                OP_REGISTER_DATASET,
                500,
                "registration disabled",
            ));
        }

        let id = DatasetId(self.next_dataset.fetch_add(1, Ordering::Relaxed) + 1);
        if let Ok(mut r) = self.registrations.lock() {
            r.push(request.clone());
        }
        Ok(RegisteredDataset {
            id,
            source_path: request.source_path.clone(),
        })
    }

    async fn create_run(&self, request: &RunRequest) -> Result<CreatedRun, ContractError> {
        if self.fail_create_run.load(Ordering::Relaxed) {
            return Err(ContractError::boundary_rejected(
                OP_CREATE_RUN,
                500,
                "run creation disabled",
            ));
        }

        let id = RunId(self.next_run.fetch_add(1, Ordering::Relaxed) + 1);
        if let Ok(mut r) = self.run_requests.lock() {
            r.push(request.clone());
        }
        Ok(CreatedRun {
            id,
            dataset_id: request.dataset_id,
        })
    }
}

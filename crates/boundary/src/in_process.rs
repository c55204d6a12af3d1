//! In-process boundary: register and enqueue straight into the run store
//! and dispatcher queue of the same process.

use std::path::Path;
use std::sync::Arc;

use contracts::{
    ContractError, CreatedRun, DatasetRegistration, IngestBoundary, NewDataset, RegisteredDataset,
    RunRequest, RunStatus, RunStore,
};
use dispatcher::RunQueue;
use tracing::{info, instrument, warn};

use crate::http::{OP_CREATE_RUN, OP_REGISTER_DATASET};

/// Status codes mirror what the HTTP API answers for the same conditions
const STATUS_BAD_REQUEST: u16 = 400;
const STATUS_NOT_FOUND: u16 = 404;
const STATUS_INTERNAL: u16 = 500;
const STATUS_UNAVAILABLE: u16 = 503;

pub struct InProcessBoundary {
    store: Arc<dyn RunStore>,
    queue: RunQueue,
}

impl InProcessBoundary {
    pub fn new(store: Arc<dyn RunStore>, queue: RunQueue) -> Self {
        Self { store, queue }
    }
}

impl IngestBoundary for InProcessBoundary {
    fn name(&self) -> &str {
        "in_process"
    }

    #[instrument(name = "in_process_register_dataset", skip(self, request), fields(name = %request.name))]
    async fn register_dataset(
        &self,
        request: &DatasetRegistration,
    ) -> Result<RegisteredDataset, ContractError> {
        if !Path::new(&request.source_path).is_file() {
            return Err(ContractError::boundary_rejected(
                OP_REGISTER_DATASET,
                STATUS_BAD_REQUEST,
                format!("source_path not found: {}", request.source_path),
            ));
        }

        let dataset = self
            .store
            .create_dataset(NewDataset {
                name: request.name.clone(),
                source_path: request.source_path.clone(),
                meta: request.meta.clone(),
            })
            .map_err(|e| {
                ContractError::boundary_rejected(OP_REGISTER_DATASET, STATUS_INTERNAL, e.to_string())
            })?;

        info!(dataset_id = %dataset.id, source_path = %dataset.source_path, "dataset registered");
        Ok(RegisteredDataset {
            id: dataset.id,
            source_path: dataset.source_path,
        })
    }

    #[instrument(name = "in_process_create_run", skip(self, request), fields(dataset_id = %request.dataset_id))]
    async fn create_run(&self, request: &RunRequest) -> Result<CreatedRun, ContractError> {
        let run = self
            .store
            .create_run(request.dataset_id, &request.model_type)
            .map_err(|e| {
                ContractError::boundary_rejected(OP_CREATE_RUN, STATUS_INTERNAL, e.to_string())
            })?
            .ok_or_else(|| {
                ContractError::boundary_rejected(OP_CREATE_RUN, STATUS_NOT_FOUND, "dataset not found")
            })?;

        if let Err(e) = self.queue.enqueue(run.id).await {
            let reason = e.to_string();
            // nothing will ever execute it
            if let Err(store_err) =
                self.store.transition_run(run.id, RunStatus::Canceled, Some(&reason))
            {
                warn!(run_id = %run.id, error = %store_err, "failed to cancel unqueued run");
            }
            return Err(ContractError::boundary_rejected(
                OP_CREATE_RUN,
                STATUS_UNAVAILABLE,
                reason,
            ));
        }

        info!(run_id = %run.id, model_type = %run.model_type, "run created and enqueued");
        Ok(CreatedRun {
            id: run.id,
            dataset_id: run.dataset_id,
        })
    }
}

//! IngestBoundary trait - the registration/enqueue surface
//!
//! The watcher reaches dataset registration and run creation only through this
//! trait. Payload shapes match the JSON request/response bodies of the HTTP
//! boundary; unknown response fields are ignored.

use serde::{Deserialize, Serialize};

use crate::{ContractError, DatasetId, DatasetMeta, RunId};

/// Register-dataset request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRegistration {
    pub name: String,
    pub source_path: String,
    #[serde(default)]
    pub meta: DatasetMeta,
}

/// Register-dataset response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredDataset {
    pub id: DatasetId,
    pub source_path: String,
}

/// Create-run request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub dataset_id: DatasetId,
    pub model_type: String,
}

/// Create-run response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRun {
    pub id: RunId,
    pub dataset_id: DatasetId,
}

/// Boundary client trait
///
/// Any non-success answer or transport problem is an error; callers never
/// retry.
#[trait_variant::make(IngestBoundary: Send)]
pub trait LocalIngestBoundary {
    /// Boundary name (used for logging)
    fn name(&self) -> &str;

    /// Register a dataset
    ///
    /// # Errors
    /// [`ContractError::BoundaryRejected`] or [`ContractError::BoundaryTransport`]
    async fn register_dataset(
        &self,
        request: &DatasetRegistration,
    ) -> Result<RegisteredDataset, ContractError>;

    /// Create (and enqueue) a run for a registered dataset
    ///
    /// # Errors
    /// [`ContractError::BoundaryRejected`] or [`ContractError::BoundaryTransport`]
    async fn create_run(&self, request: &RunRequest) -> Result<CreatedRun, ContractError>;
}

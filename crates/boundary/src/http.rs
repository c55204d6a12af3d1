//! HTTP boundary client
//!
//! `POST {base}/datasets` and `POST {base}/runs` with JSON bodies.

use contracts::{
    BoundaryConfig, ContractError, CreatedRun, DatasetRegistration, IngestBoundary,
    RegisteredDataset, RunRequest,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

pub const OP_REGISTER_DATASET: &str = "register_dataset";
pub const OP_CREATE_RUN: &str = "create_run";

/// Boundary client for a remote API
#[derive(Debug, Clone)]
pub struct HttpBoundary {
    base_url: String,
    client: Client,
}

impl HttpBoundary {
    /// Build a client from configuration
    ///
    /// # Errors
    /// [`ContractError::BoundaryTransport`] when the HTTP client cannot be built
    pub fn new(config: &BoundaryConfig) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ContractError::boundary_transport("build_client", e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, operation: &str, path: &str, body: &B) -> Result<R, ContractError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ContractError::boundary_transport(operation, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(ContractError::boundary_rejected(
                operation,
                status.as_u16(),
                text,
            ));
        }

        debug!(operation, url = %url, status = status.as_u16(), "boundary call succeeded");
        response.json::<R>().await.map_err(|e| {
            ContractError::boundary_transport(operation, format!("invalid response body: {e}"))
        })
    }
}

impl IngestBoundary for HttpBoundary {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(name = "http_register_dataset", skip(self, request), fields(name = %request.name))]
    async fn register_dataset(
        &self,
        request: &DatasetRegistration,
    ) -> Result<RegisteredDataset, ContractError> {
        self.post(OP_REGISTER_DATASET, "datasets", request).await
    }

    #[instrument(name = "http_create_run", skip(self, request), fields(dataset_id = %request.dataset_id))]
    async fn create_run(&self, request: &RunRequest) -> Result<CreatedRun, ContractError> {
        self.post(OP_CREATE_RUN, "runs", request).await
    }
}

//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{IngestBoundary, RunRequest, RunStatus, RunStore};
use ingestion::{fingerprint, registration_for};
use tracing::info;

use super::load_config;
use crate::cli::{Cli, RunArgs};
use crate::error::CliError;
use crate::pipeline::LocalPipeline;

/// Execute the `run` command
pub async fn run_once(cli: &Cli, args: &RunArgs) -> Result<()> {
    if !args.file.is_file() {
        return Err(CliError::file_not_found(&args.file).into());
    }
    let config = load_config(cli)?;
    let variant = args
        .variant
        .clone()
        .unwrap_or_else(|| config.watcher.default_variant.clone());

    let file = args.file.clone();
    let fp = tokio::task::spawn_blocking(move || fingerprint(&file))
        .await
        .context("Fingerprint task failed")?
        .with_context(|| format!("Failed to fingerprint {}", args.file.display()))?;

    let pipeline = LocalPipeline::start(&config)?;
    let boundary = pipeline.boundary();
    let dataset = boundary
        .register_dataset(&registration_for(&args.file, &fp))
        .await
        .context("Failed to register dataset")?;
    let created = boundary
        .create_run(&RunRequest {
            dataset_id: dataset.id,
            model_type: variant.clone(),
        })
        .await
        .context("Failed to create run")?;
    info!(dataset_id = %dataset.id, run_id = %created.id, variant = %variant, "Run queued");

    let store = pipeline.store();
    // shutdown drains the queue, so the run is terminal afterwards
    let stats = pipeline.shutdown().await;
    info!(duration_secs = stats.duration.as_secs_f64(), "Run executed");

    let run = store
        .get_run(created.id)
        .context("Failed to read run")?
        .ok_or(CliError::RunNotFound { run_id: created.id })?;
    println!(
        "{}",
        serde_json::to_string_pretty(&run).context("Failed to serialize run")?
    );

    if run.status != RunStatus::Success {
        return Err(CliError::run_failed(
            run.id,
            run.status.to_string(),
            run.error.clone().unwrap_or_default(),
        )
        .into());
    }
    Ok(())
}

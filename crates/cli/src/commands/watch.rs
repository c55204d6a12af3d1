//! `watch` command implementation.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use boundary::HttpBoundary;
use ingestion::{change_source_for, IngestWatcher};
use tracing::{info, warn};

use super::{load_config, shutdown_signal};
use crate::cli::Cli;

/// Execute the `watch` command
pub async fn run_watch(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let client = HttpBoundary::new(&config.boundary).context("Failed to build API client")?;
    info!(api_base = %client.base_url(), "Registering through remote API");

    let started = Instant::now();
    let handle = IngestWatcher::new(config.watcher.clone(), Arc::new(client))
        .start(change_source_for(&config.watcher))
        .context("Failed to start watcher")?;

    shutdown_signal().await;
    warn!("Received shutdown signal, stopping watcher...");

    let stats = handle.shutdown().await;
    info!(
        %stats,
        duration_secs = started.elapsed().as_secs_f64(),
        "watcher finished"
    );
    Ok(())
}

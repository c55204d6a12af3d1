//! `serve` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use ingestion::{change_source_for, IngestWatcher};
use tracing::{info, warn};

use super::{load_config, shutdown_signal};
use crate::cli::{Cli, ServeArgs};
use crate::pipeline::LocalPipeline;

/// Execute the `serve` command
pub async fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(workers) = args.workers.filter(|&w| w > 0) {
        info!(workers, "Overriding worker count from CLI");
        config.executor.workers = workers;
    }

    let pipeline = LocalPipeline::start(&config)?;
    let watcher = IngestWatcher::new(config.watcher.clone(), Arc::new(pipeline.boundary()));
    let handle = watcher
        .start(change_source_for(&config.watcher))
        .context("Failed to start watcher")?;

    info!(
        watch_root = %config.watcher.watch_root.display(),
        source = ?config.watcher.source,
        "Serving; press Ctrl+C to stop"
    );
    shutdown_signal().await;
    warn!("Received shutdown signal, stopping...");

    // stop intake first so the dispatcher can drain what was already queued
    let watcher_stats = handle.shutdown().await;
    let mut stats = pipeline.shutdown().await;
    stats.watcher = Some(watcher_stats);

    info!(
        ingested = watcher_stats.ingested,
        executed = stats.dispatch.executed,
        duration_secs = stats.duration.as_secs_f64(),
        "dropzone stopped"
    );
    stats.print_summary();
    Ok(())
}

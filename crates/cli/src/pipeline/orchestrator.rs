//! Local pipeline - store, executor and dispatcher of one process.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use boundary::InProcessBoundary;
use contracts::{RunStore, ServiceConfig};
use dispatcher::RunDispatcher;
use observability::RunMetricsAggregator;
use run_engine::{MemoryRunStore, PipelineExecutor};
use stages::BaselineStages;
use tracing::info;

use super::ServeStats;

/// Everything needed to accept and execute runs in-process
pub struct LocalPipeline {
    store: Arc<MemoryRunStore>,
    dispatcher: RunDispatcher,
    aggregator: Arc<Mutex<RunMetricsAggregator>>,
    started: Instant,
}

impl LocalPipeline {
    /// Build the store and executor and spawn the dispatcher workers
    pub fn start(config: &ServiceConfig) -> Result<Self> {
        let store = Arc::new(
            MemoryRunStore::for_data_root(&config.data_root).with_context(|| {
                format!("Failed to scan runs under {}", config.data_root.display())
            })?,
        );
        let aggregator = Arc::new(Mutex::new(RunMetricsAggregator::new()));
        let executor = PipelineExecutor::new(
            Arc::clone(&store) as Arc<dyn RunStore>,
            Arc::new(BaselineStages),
            &config.data_root,
        )
        .with_aggregator(Arc::clone(&aggregator));
        let dispatcher = RunDispatcher::spawn(Arc::new(executor), &config.executor);

        info!(
            data_root = %config.data_root.display(),
            workers = config.executor.workers,
            "local pipeline started"
        );
        Ok(Self {
            store,
            dispatcher,
            aggregator,
            started: Instant::now(),
        })
    }

    pub fn store(&self) -> Arc<MemoryRunStore> {
        Arc::clone(&self.store)
    }

    /// Boundary that registers into this pipeline's store and queue
    pub fn boundary(&self) -> InProcessBoundary {
        InProcessBoundary::new(
            Arc::clone(&self.store) as Arc<dyn RunStore>,
            self.dispatcher.queue(),
        )
    }

    /// Drain the queue, stop the workers and collect statistics
    pub async fn shutdown(self) -> ServeStats {
        let dispatch = self.dispatcher.shutdown().await;
        let runs = self
            .aggregator
            .lock()
            .map(|a| a.summary())
            .unwrap_or_default();
        ServeStats {
            duration: self.started.elapsed(),
            watcher: None,
            dispatch,
            runs,
        }
    }
}

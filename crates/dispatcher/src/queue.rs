//! RunQueue - producer side of the run work queue

use std::sync::Arc;

use contracts::RunId;
use observability::{record_queue_depth, record_run_enqueued};
use tracing::debug;

use crate::error::DispatcherError;
use crate::metrics::DispatchMetrics;

/// Cloneable handle for enqueueing runs
#[derive(Debug, Clone)]
pub struct RunQueue {
    tx: async_channel::Sender<RunId>,
    metrics: Arc<DispatchMetrics>,
}

impl RunQueue {
    pub(crate) fn new(tx: async_channel::Sender<RunId>, metrics: Arc<DispatchMetrics>) -> Self {
        Self { tx, metrics }
    }

    /// Enqueue a run, waiting for capacity when the queue is full
    ///
    /// # Errors
    /// [`DispatcherError::QueueClosed`] after shutdown
    pub async fn enqueue(&self, run_id: RunId) -> Result<(), DispatcherError> {
        self.tx
            .send(run_id)
            .await
            .map_err(|_| DispatcherError::QueueClosed { run_id })?;

        self.metrics.inc_enqueued();
        self.metrics.set_queue_len(self.tx.len());
        record_run_enqueued();
        record_queue_depth(self.tx.len());
        debug!(run_id = %run_id, queued = self.tx.len(), "run enqueued");
        Ok(())
    }

    /// Runs waiting for a worker
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop accepting runs; queued runs are still drained by the workers
    pub fn close(&self) {
        self.tx.close();
    }
}

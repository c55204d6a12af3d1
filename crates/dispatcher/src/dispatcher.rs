//! RunDispatcher - worker pool draining the run queue

use std::sync::Arc;

use contracts::{ExecutorConfig, RunId};
use observability::record_queue_depth;
use run_engine::{ExecutionOutcome, PipelineExecutor};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::claims::RunClaims;
use crate::metrics::{DispatchMetrics, DispatchSnapshot};
use crate::queue::RunQueue;

/// Running dispatcher: bounded queue plus N worker tasks
pub struct RunDispatcher {
    queue: RunQueue,
    metrics: Arc<DispatchMetrics>,
    claims: RunClaims,
    workers: Vec<JoinHandle<()>>,
}

impl RunDispatcher {
    /// Create the queue and spawn the workers
    #[instrument(
        name = "run_dispatcher_spawn",
        skip(executor, config),
        fields(workers = config.workers, queue_capacity = config.queue_capacity)
    )]
    pub fn spawn(executor: Arc<PipelineExecutor>, config: &ExecutorConfig) -> Self {
        let (tx, rx) = async_channel::bounded(config.queue_capacity.max(1));
        let metrics = Arc::new(DispatchMetrics::new());
        let claims = RunClaims::new();

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let executor = Arc::clone(&executor);
                let metrics = Arc::clone(&metrics);
                let claims = claims.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, rx, executor, metrics, claims).await;
                })
            })
            .collect();

        info!("run dispatcher started");
        Self {
            queue: RunQueue::new(tx, Arc::clone(&metrics)),
            metrics,
            claims,
            workers,
        }
    }

    /// Producer handle
    pub fn queue(&self) -> RunQueue {
        self.queue.clone()
    }

    pub fn claims(&self) -> &RunClaims {
        &self.claims
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    /// Close the queue, let workers drain it and wait for them
    #[instrument(name = "run_dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self) -> DispatchSnapshot {
        self.queue.close();
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "run worker panicked");
            }
        }
        let snapshot = self.metrics.snapshot();
        info!(%snapshot, "run dispatcher stopped");
        snapshot
    }
}

#[instrument(name = "run_worker_loop", skip(rx, executor, metrics, claims))]
async fn run_worker(
    worker_id: usize,
    rx: async_channel::Receiver<RunId>,
    executor: Arc<PipelineExecutor>,
    metrics: Arc<DispatchMetrics>,
    claims: RunClaims,
) {
    debug!("run worker started");

    while let Ok(run_id) = rx.recv().await {
        metrics.set_queue_len(rx.len());
        record_queue_depth(rx.len());

        let Some(_claim) = claims.try_claim(run_id) else {
            metrics.inc_duplicate_claims();
            warn!(run_id = %run_id, "run already being executed, dropping duplicate");
            continue;
        };

        metrics.inc_executed();
        match executor.execute(run_id).await {
            Ok(ExecutionOutcome::Succeeded) => metrics.inc_succeeded(),
            Ok(ExecutionOutcome::Failed { stage, error }) => {
                metrics.inc_failed();
                warn!(run_id = %run_id, stage = %stage, error = %error, "run failed");
            }
            Ok(ExecutionOutcome::Skipped { .. }) | Ok(ExecutionOutcome::NotFound) => {
                metrics.inc_skipped();
            }
            Err(e) => {
                metrics.inc_errors();
                error!(run_id = %run_id, error = %e, "run execution error");
            }
        }
    }

    debug!("run worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        DatasetMeta, Metrics, NewDataset, RunStatus, RunStore, StageResult, Stages, METRICS_FILE,
    };
    use run_engine::MemoryRunStore;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Counts prepare calls; sleeps to widen race windows
    struct CountingStages {
        prepares: Arc<AtomicU64>,
        delay: Duration,
    }

    impl Stages for CountingStages {
        fn prepare(&self, _source: &Path, out_dir: &Path) -> StageResult<PathBuf> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(out_dir.join("processed.csv"))
        }

        fn fit(&self, _p: &Path, out_dir: &Path, _variant: &str) -> StageResult<PathBuf> {
            Ok(out_dir.join("model.json"))
        }

        fn score(&self, _p: &Path, _m: &Path, out_dir: &Path) -> StageResult<Metrics> {
            std::fs::write(out_dir.join(METRICS_FILE), "{}")?;
            Ok(Metrics::new())
        }
    }

    struct Setup {
        _dir: tempfile::TempDir,
        store: Arc<MemoryRunStore>,
        prepares: Arc<AtomicU64>,
        dispatcher: RunDispatcher,
    }

    fn setup(workers: usize, delay: Duration) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryRunStore::new());
        let prepares = Arc::new(AtomicU64::new(0));
        let stages = CountingStages {
            prepares: Arc::clone(&prepares),
            delay,
        };
        let executor = Arc::new(PipelineExecutor::new(
            store.clone(),
            Arc::new(stages),
            dir.path(),
        ));
        let config = ExecutorConfig {
            workers,
            queue_capacity: 8,
        };
        let dispatcher = RunDispatcher::spawn(executor, &config);
        Setup {
            _dir: dir,
            store,
            prepares,
            dispatcher,
        }
    }

    fn new_run(store: &MemoryRunStore) -> RunId {
        let ds = store
            .create_dataset(NewDataset {
                name: "d".into(),
                source_path: "/tmp/d.csv".into(),
                meta: DatasetMeta::new(),
            })
            .unwrap();
        store.create_run(ds.id, "baseline").unwrap().unwrap().id
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_are_executed_and_drained_on_shutdown() {
        let s = setup(2, Duration::from_millis(5));
        let queue = s.dispatcher.queue();
        let ids: Vec<_> = (0..4).map(|_| new_run(&s.store)).collect();
        for id in &ids {
            queue.enqueue(*id).await.unwrap();
        }

        let snapshot = s.dispatcher.shutdown().await;
        assert_eq!(snapshot.enqueued, 4);
        assert_eq!(snapshot.succeeded, 4);
        for id in ids {
            let run = s.store.get_run(id).unwrap().unwrap();
            assert_eq!(run.status, RunStatus::Success);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_duplicate_dispatch_executes_once() {
        let s = setup(2, Duration::from_millis(100));
        let queue = s.dispatcher.queue();
        let id = new_run(&s.store);
        queue.enqueue(id).await.unwrap();
        queue.enqueue(id).await.unwrap();

        let snapshot = s.dispatcher.shutdown().await;
        assert_eq!(s.prepares.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.duplicate_claims + snapshot.skipped, 1);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let s = setup(1, Duration::ZERO);
        let queue = s.dispatcher.queue();
        s.dispatcher.shutdown().await;

        assert!(queue.is_closed());
        let err = queue.enqueue(RunId(1)).await.unwrap_err();
        assert!(matches!(err, crate::DispatcherError::QueueClosed { .. }));
    }

    #[tokio::test]
    async fn test_unknown_run_is_skipped() {
        let s = setup(1, Duration::ZERO);
        s.dispatcher.queue().enqueue(RunId(77)).await.unwrap();
        let snapshot = s.dispatcher.shutdown().await;
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.succeeded, 0);
    }
}

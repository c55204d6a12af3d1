//! IngestWatcher - turns change notifications into dataset registrations
//!
//! One coordinator task owns the debounce map and the in-flight set; the
//! change source reaches it only through a channel. Every ready candidate is
//! evaluated in its own task:
//!
//! ```text
//! sentinel gate -> stability wait -> fingerprint -> register -> create run
//! ```
//!
//! A notification for a candidate that is still waiting to settle is folded
//! into it. Once the candidate has settled its snapshot is fixed, so a later
//! notification marks the path dirty and it is debounced again when the
//! candidate finishes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use contracts::{ChangeSource, IngestBoundary, RunRequest, WatchEvent, WatchEventCallback, WatcherConfig};
use observability::{record_candidate_outcome, record_file_event, record_file_ignored, record_stability_wait};
use tokio::task::{AbortHandle, JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::debounce::Debouncer;
use crate::eligibility::{companion_of, is_sentinel, sentinel_for, Eligibility};
use crate::error::{IngestionError, Result};
use crate::fingerprint::{fingerprint, registration_for};
use crate::stability::wait_until_stable;
use crate::stats::{CandidateOutcome, WatcherSnapshot, WatcherStats};

enum Command {
    Event(WatchEvent),
    Shutdown,
}

/// File ingestion watcher
pub struct IngestWatcher<B> {
    config: WatcherConfig,
    boundary: Arc<B>,
    stats: Arc<WatcherStats>,
}

impl<B> IngestWatcher<B>
where
    B: IngestBoundary + Sync + 'static,
{
    pub fn new(config: WatcherConfig, boundary: Arc<B>) -> Self {
        Self {
            config,
            boundary,
            stats: Arc::new(WatcherStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<WatcherStats> {
        Arc::clone(&self.stats)
    }

    /// Create the watch root, start `source` and spawn the coordinator.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// [`IngestionError::WatchRoot`] or [`IngestionError::ChangeSource`]
    #[instrument(
        name = "ingest_watcher_start",
        skip(self, source),
        fields(
            root = %self.config.watch_root.display(),
            source = source.name(),
            boundary = self.boundary.name(),
        )
    )]
    pub fn start(self, source: Box<dyn ChangeSource>) -> Result<WatcherHandle> {
        let root = self.config.watch_root.clone();
        std::fs::create_dir_all(&root).map_err(|e| IngestionError::watch_root(&root, e))?;

        let (tx, rx) = async_channel::unbounded();
        let events = tx.clone();
        let callback: WatchEventCallback = Arc::new(move |event| {
            // unbounded: only fails once the coordinator is gone
            let _ = events.try_send(Command::Event(event));
        });
        source.listen(callback)?;

        info!(
            include_ext = ?self.config.include_ext,
            ignore_suffixes = ?self.config.ignore_suffixes,
            stability_window_secs = self.config.stability_window_secs,
            require_done_file = self.config.require_done_file,
            auto_run = self.config.auto_run,
            "watching for new files"
        );

        let coordinator = Coordinator {
            eligibility: Eligibility::new(&self.config),
            debouncer: Debouncer::new(self.config.debounce()),
            flush_interval: self.config.flush_interval(),
            source_name: source.name().to_string(),
            in_flight: HashMap::new(),
            dirty: HashSet::new(),
            tasks: JoinSet::new(),
            ctx: Arc::new(CandidateContext {
                config: self.config,
                boundary: self.boundary,
                stats: Arc::clone(&self.stats),
            }),
        };
        let task = tokio::spawn(coordinator.run(rx, source));

        Ok(WatcherHandle {
            tx,
            task,
            stats: self.stats,
        })
    }
}

/// Running watcher
pub struct WatcherHandle {
    tx: Sender<Command>,
    task: JoinHandle<()>,
    stats: Arc<WatcherStats>,
}

impl WatcherHandle {
    pub fn stats(&self) -> WatcherSnapshot {
        self.stats.snapshot()
    }

    /// Stop the source and the coordinator. Candidates still in flight are
    /// abandoned.
    pub async fn shutdown(self) -> WatcherSnapshot {
        let _ = self.tx.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            error!(error = ?e, "watcher coordinator panicked");
        }
        self.stats.snapshot()
    }
}

struct CandidateContext<B> {
    config: WatcherConfig,
    boundary: Arc<B>,
    stats: Arc<WatcherStats>,
}

struct InFlight {
    handle: AbortHandle,
    /// Set once the stability wait is over
    settled: Arc<AtomicBool>,
}

struct Coordinator<B> {
    ctx: Arc<CandidateContext<B>>,
    eligibility: Eligibility,
    debouncer: Debouncer,
    flush_interval: Duration,
    source_name: String,
    in_flight: HashMap<PathBuf, InFlight>,
    /// In-flight paths that changed after they settled
    dirty: HashSet<PathBuf>,
    tasks: JoinSet<PathBuf>,
}

impl<B> Coordinator<B>
where
    B: IngestBoundary + Sync + 'static,
{
    async fn run(mut self, rx: Receiver<Command>, source: Box<dyn ChangeSource>) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Ok(Command::Event(event)) => self.on_event(event),
                    Ok(Command::Shutdown) | Err(_) => break,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.on_finished(joined);
                }
                _ = ticker.tick() => self.flush(),
            }
        }

        source.stop();
        let abandoned = self.tasks.len();
        self.tasks.shutdown().await;
        info!(
            abandoned,
            pending = self.debouncer.len(),
            stats = %self.ctx.stats.snapshot(),
            "watcher stopped"
        );
    }

    fn on_event(&mut self, event: WatchEvent) {
        self.ctx.stats.record_event();
        record_file_event(&self.source_name);

        let candidate = if is_sentinel(&event.path) {
            // a late sentinel releases its data file
            companion_of(&event.path)
                .filter(|_| self.ctx.config.require_done_file)
                .filter(|companion| self.eligibility.accepts_name(companion))
        } else {
            Some(event.path).filter(|p| self.eligibility.accepts_name(p))
        };

        match candidate {
            Some(path) => {
                trace!(path = %path.display(), kind = ?event.kind, "debouncing");
                self.debouncer.mark(path, Instant::now());
            }
            None => {
                self.ctx.stats.record_ignored();
                record_file_ignored();
            }
        }
    }

    fn flush(&mut self) {
        for path in self.debouncer.drain_ready(Instant::now()) {
            if let Some(current) = self.in_flight.get(&path) {
                self.ctx.stats.record_coalesced();
                if current.settled.load(Ordering::Acquire) {
                    debug!(path = %path.display(), "changed after settling, will re-evaluate");
                    self.dirty.insert(path);
                } else {
                    debug!(path = %path.display(), "already in flight, folding notification");
                }
                continue;
            }

            self.ctx.stats.record_scheduled();
            let ctx = Arc::clone(&self.ctx);
            let settled = Arc::new(AtomicBool::new(false));
            let task_settled = Arc::clone(&settled);
            let task_path = path.clone();
            let handle = self.tasks.spawn(async move {
                let outcome = evaluate_candidate(&ctx, &task_path, &task_settled).await;
                ctx.stats.record_outcome(&outcome);
                record_candidate_outcome(outcome.label());
                task_path
            });
            self.in_flight.insert(path, InFlight { handle, settled });
        }
    }

    fn on_finished(&mut self, joined: std::result::Result<PathBuf, JoinError>) {
        match joined {
            Ok(path) => {
                self.in_flight.remove(&path);
                self.requeue_if_dirty(path);
            }
            Err(e) => {
                error!(error = %e, "candidate task failed");
                let finished: Vec<PathBuf> = self
                    .in_flight
                    .iter()
                    .filter(|(_, f)| f.handle.is_finished())
                    .map(|(path, _)| path.clone())
                    .collect();
                for path in finished {
                    self.in_flight.remove(&path);
                    self.requeue_if_dirty(path);
                }
            }
        }
    }

    fn requeue_if_dirty(&mut self, path: PathBuf) {
        if self.dirty.remove(&path) {
            debug!(path = %path.display(), "re-queueing changed file");
            self.debouncer.mark(path, Instant::now());
        }
    }
}

#[instrument(name = "watcher_candidate", skip(ctx, settled), fields(path = %path.display()))]
async fn evaluate_candidate<B>(
    ctx: &CandidateContext<B>,
    path: &Path,
    settled: &AtomicBool,
) -> CandidateOutcome
where
    B: IngestBoundary + Sync,
{
    let config = &ctx.config;
    if config.require_done_file {
        let sentinel = sentinel_for(path);
        if !tokio::fs::try_exists(&sentinel).await.unwrap_or(false) {
            info!("waiting for sentinel file");
            return CandidateOutcome::AwaitingSentinel;
        }
    }

    info!("candidate");
    let started = Instant::now();
    match wait_until_stable(path, config.stability_window(), config.poll_interval()).await {
        Ok(Some(size)) => {
            settled.store(true, Ordering::Release);
            record_stability_wait(started.elapsed());
            debug!(size, "file settled");
        }
        Ok(None) => {
            info!("not stable or missing");
            return CandidateOutcome::Vanished;
        }
        Err(e) => {
            warn!(error = %e, "stability check failed");
            return CandidateOutcome::Vanished;
        }
    }

    let owned = path.to_path_buf();
    let fp = match tokio::task::spawn_blocking(move || fingerprint(&owned)).await {
        Ok(Ok(fp)) => fp,
        Ok(Err(e)) => {
            warn!(error = %e, "metadata error");
            return CandidateOutcome::FingerprintFailed;
        }
        Err(e) => {
            error!(error = %e, "fingerprint task failed");
            return CandidateOutcome::FingerprintFailed;
        }
    };

    let registration = registration_for(path, &fp);
    let dataset = match ctx.boundary.register_dataset(&registration).await {
        Ok(dataset) => dataset,
        Err(e) => {
            warn!(error = %e, "dataset registration failed");
            return CandidateOutcome::RegistrationFailed;
        }
    };
    info!(
        dataset_id = %dataset.id,
        size_bytes = fp.size_bytes,
        sha256 = %fp.sha256,
        "dataset registered"
    );

    if !config.auto_run {
        return CandidateOutcome::Ingested {
            dataset_id: dataset.id,
            run_id: None,
        };
    }

    let request = RunRequest {
        dataset_id: dataset.id,
        model_type: config.default_variant.clone(),
    };
    match ctx.boundary.create_run(&request).await {
        Ok(run) => {
            info!(dataset_id = %dataset.id, run_id = %run.id, "run created");
            CandidateOutcome::Ingested {
                dataset_id: dataset.id,
                run_id: Some(run.id),
            }
        }
        Err(e) => {
            warn!(dataset_id = %dataset.id, error = %e, "run creation failed");
            CandidateOutcome::RunCreationFailed {
                dataset_id: dataset.id,
            }
        }
    }
}

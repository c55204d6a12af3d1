//! Pipeline executor
//!
//! Drives one run through `prepare -> fit -> score`, recording every step
//! transition, artifact and log line. Stage functions run on the blocking
//! pool; a stage error or panic fails that step and the run, nothing else.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use contracts::{
    Artifacts, Metrics, Run, RunId, RunStatus, RunStore, StageError, StageName, Stages,
    StepStatus, StoreError, METRICS_FILE,
};
use observability::{record_run_finished, record_stage_duration, RunMetricsAggregator};
use tracing::{error, info, instrument, warn};

use crate::{EngineError, RunLog, RunWorkspace};

/// Result of one [`PipelineExecutor::execute`] call
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// All three stages succeeded
    Succeeded,
    /// A stage failed; the run is now `failed`
    Failed { stage: StageName, error: String },
    /// The run was not `queued`, nothing was executed
    Skipped { status: RunStatus },
    /// No run with that id
    NotFound,
}

impl ExecutionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
            Self::NotFound => "not_found",
        }
    }
}

/// What a stage produced
struct StageOutput {
    path: PathBuf,
    metrics: Option<Metrics>,
}

/// Why a stage did not produce anything
struct StageFailure {
    message: String,
    causes: Vec<String>,
}

impl StageFailure {
    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    fn from_error(err: &StageError) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: err.to_string(),
            causes,
        }
    }

    fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Self::plain(format!("stage panicked: {detail}"))
        } else {
            Self::plain(format!("stage task aborted: {err}"))
        }
    }
}

/// Sequential three-stage executor
pub struct PipelineExecutor {
    store: Arc<dyn RunStore>,
    stages: Arc<dyn Stages>,
    logs: RunLog,
    data_root: PathBuf,
    aggregator: Option<Arc<Mutex<RunMetricsAggregator>>>,
}

impl PipelineExecutor {
    pub fn new(store: Arc<dyn RunStore>, stages: Arc<dyn Stages>, data_root: &Path) -> Self {
        Self {
            store,
            stages,
            logs: RunLog::new(data_root),
            data_root: data_root.to_path_buf(),
            aggregator: None,
        }
    }

    /// Also feed stage and run timings into `aggregator`
    pub fn with_aggregator(mut self, aggregator: Arc<Mutex<RunMetricsAggregator>>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// The log store this executor writes to
    pub fn logs(&self) -> &RunLog {
        &self.logs
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Execute a queued run to a terminal status
    ///
    /// # Errors
    /// Only store failures; stage failures are reported as
    /// [`ExecutionOutcome::Failed`]. A store failure after the run started
    /// still leaves it `failed` when the store allows it.
    #[instrument(name = "pipeline_execute", skip(self), fields(run_id = %run_id))]
    pub async fn execute(&self, run_id: RunId) -> Result<ExecutionOutcome, EngineError> {
        let Some(run) = self.store.get_run(run_id)? else {
            warn!("run not found, nothing to execute");
            return Ok(ExecutionOutcome::NotFound);
        };
        if run.status != RunStatus::Queued {
            info!(status = %run.status, "run is not queued, skipping");
            return Ok(ExecutionOutcome::Skipped { status: run.status });
        }

        match self.store.transition_run(run_id, RunStatus::Running, None) {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(ExecutionOutcome::NotFound),
            Err(StoreError::IllegalRunTransition { from, .. }) => {
                info!(status = %from, "run claimed elsewhere, skipping");
                return Ok(ExecutionOutcome::Skipped { status: from });
            }
            Err(e) => return Err(e.into()),
        }

        let started = Instant::now();
        info!(dataset_id = %run.dataset_id, variant = %run.model_type, "run started");
        self.note(
            run_id,
            &format!(
                "run started (dataset_id={}, variant={})",
                run.dataset_id, run.model_type
            ),
        );

        let result = self.run_stages(&run).await;
        let status = match &result {
            Ok(ExecutionOutcome::Succeeded) => RunStatus::Success,
            Ok(_) => RunStatus::Failed,
            Err(e) => {
                self.abandon(run_id, e);
                RunStatus::Failed
            }
        };
        record_run_finished(status, started.elapsed());
        if let Some(agg) = &self.aggregator {
            if let Ok(mut agg) = agg.lock() {
                agg.record_run(status, started.elapsed());
            }
        }
        result
    }

    /// Best-effort close of a `running` run after a store error: one step
    /// and the run end up `failed`, so the run never stays `running`.
    fn abandon(&self, run_id: RunId, err: &EngineError) {
        let message = format!("run aborted: {err}");
        error!(error = %err, "store error during execution, failing run");
        self.note(run_id, &message);

        let run = match self.store.get_run(run_id) {
            Ok(Some(run)) if !run.status.is_terminal() => run,
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "cannot read run to abandon it");
                return;
            }
        };

        let open_step = run
            .steps
            .iter()
            .find(|s| s.status == StepStatus::Running)
            .or_else(|| run.steps.iter().find(|s| s.status == StepStatus::Pending));
        if let Some(step) = open_step {
            let stage = step.name;
            let opened = if step.status == StepStatus::Pending {
                self.store
                    .transition_step(run_id, stage, StepStatus::Running, None)
                    .map(|_| ())
            } else {
                Ok(())
            };
            let failed = opened.and_then(|()| {
                self.store
                    .transition_step(run_id, stage, StepStatus::Failed, Some(&message))
                    .map(|_| ())
            });
            if let Err(e) = failed {
                warn!(stage = %stage, error = %e, "cannot fail step");
            }
        }

        match self
            .store
            .transition_run(run_id, RunStatus::Failed, Some(&message))
        {
            Ok(_) => self.note(run_id, "run finished: failed"),
            Err(e) => warn!(error = %e, "cannot fail run"),
        }
    }

    async fn run_stages(&self, run: &Run) -> Result<ExecutionOutcome, EngineError> {
        let run_id = run.id;

        let dataset = match self.store.get_dataset(run.dataset_id)? {
            Some(dataset) => dataset,
            None => {
                let failure = StageFailure::plain(format!("dataset {} not found", run.dataset_id));
                return self.fail_before_stages(run_id, failure);
            }
        };
        let workspace = match RunWorkspace::create(&self.data_root, run_id) {
            Ok(ws) => ws,
            Err(e) => {
                let failure = StageFailure::plain(format!("failed to create run workspace: {e}"));
                return self.fail_before_stages(run_id, failure);
            }
        };

        let source = PathBuf::from(&dataset.source_path);
        let mut outputs: BTreeMap<StageName, PathBuf> = BTreeMap::new();
        let mut metrics = Metrics::new();

        for stage in StageName::ALL {
            self.step(run_id, stage, StepStatus::Running, None)?;
            self.note(run_id, &format!("{stage}: start"));
            info!(stage = %stage, "stage started");

            let begin = Instant::now();
            let result = self
                .invoke(stage, &source, &outputs, &workspace, &run.model_type)
                .await;
            let elapsed = begin.elapsed();
            self.record_stage(stage, elapsed, result.is_ok());

            match result {
                Ok(output) => {
                    let path = output.path.display().to_string();
                    let key = stage.artifact_key();
                    self.step(
                        run_id,
                        stage,
                        StepStatus::Success,
                        Some(&format!("{key}={path}")),
                    )?;
                    let artifacts = Artifacts::from([(key.to_string(), path.clone())]);
                    self.store
                        .merge_run_outputs(run_id, Some(&artifacts), None)?
                        .ok_or(EngineError::RunVanished(run_id))?;
                    self.note(run_id, &format!("{stage}: done -> {path}"));
                    info!(stage = %stage, elapsed_ms = elapsed.as_millis() as u64, path = %path, "stage finished");

                    if let Some(m) = output.metrics {
                        metrics = m;
                    }
                    outputs.insert(stage, output.path);
                }
                Err(failure) => return self.fail(run_id, stage, failure),
            }
        }

        self.store
            .merge_run_outputs(run_id, None, Some(&metrics))?
            .ok_or(EngineError::RunVanished(run_id))?;
        self.store
            .transition_run(run_id, RunStatus::Success, None)?
            .ok_or(EngineError::RunVanished(run_id))?;
        self.note(run_id, "run finished: success");
        info!("run finished: success");
        Ok(ExecutionOutcome::Succeeded)
    }

    async fn invoke(
        &self,
        stage: StageName,
        source: &Path,
        outputs: &BTreeMap<StageName, PathBuf>,
        workspace: &RunWorkspace,
        variant: &str,
    ) -> Result<StageOutput, StageFailure> {
        let stages = Arc::clone(&self.stages);
        let out_dir = workspace.stage_dir(stage).to_path_buf();
        let upstream = |name: StageName| {
            outputs
                .get(&name)
                .cloned()
                .ok_or_else(|| StageFailure::plain(format!("{name} output missing")))
        };

        let task = match stage {
            StageName::Prepare => {
                let source = source.to_path_buf();
                tokio::task::spawn_blocking(move || {
                    stages.prepare(&source, &out_dir).map(|path| StageOutput {
                        path,
                        metrics: None,
                    })
                })
            }
            StageName::Fit => {
                let processed = upstream(StageName::Prepare)?;
                let variant = variant.to_string();
                tokio::task::spawn_blocking(move || {
                    stages
                        .fit(&processed, &out_dir, &variant)
                        .map(|path| StageOutput {
                            path,
                            metrics: None,
                        })
                })
            }
            StageName::Score => {
                let processed = upstream(StageName::Prepare)?;
                let model = upstream(StageName::Fit)?;
                tokio::task::spawn_blocking(move || {
                    stages
                        .score(&processed, &model, &out_dir)
                        .map(|metrics| StageOutput {
                            path: out_dir.join(METRICS_FILE),
                            metrics: Some(metrics),
                        })
                })
            }
        };

        match task.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(StageFailure::from_error(&e)),
            Err(join) => Err(StageFailure::from_join(join)),
        }
    }

    /// A failure detected before `prepare` could be invoked is still
    /// attributed to `prepare`
    fn fail_before_stages(
        &self,
        run_id: RunId,
        failure: StageFailure,
    ) -> Result<ExecutionOutcome, EngineError> {
        self.step(run_id, StageName::Prepare, StepStatus::Running, None)?;
        self.fail(run_id, StageName::Prepare, failure)
    }

    fn fail(
        &self,
        run_id: RunId,
        stage: StageName,
        failure: StageFailure,
    ) -> Result<ExecutionOutcome, EngineError> {
        error!(
            stage = %stage,
            error = %failure.message,
            causes = ?failure.causes,
            "stage failed"
        );
        self.note(run_id, &format!("{stage}: failed: {}", failure.message));
        for cause in &failure.causes {
            self.note(run_id, &format!("{stage}: caused by: {cause}"));
        }

        self.step(run_id, stage, StepStatus::Failed, Some(&failure.message))?;
        self.store
            .transition_run(run_id, RunStatus::Failed, Some(&failure.message))?
            .ok_or(EngineError::RunVanished(run_id))?;
        self.note(run_id, "run finished: failed");

        Ok(ExecutionOutcome::Failed {
            stage,
            error: failure.message,
        })
    }

    fn step(
        &self,
        run_id: RunId,
        stage: StageName,
        status: StepStatus,
        message: Option<&str>,
    ) -> Result<(), EngineError> {
        self.store
            .transition_step(run_id, stage, status, message)?
            .ok_or(EngineError::RunVanished(run_id))?;
        Ok(())
    }

    fn record_stage(&self, stage: StageName, elapsed: std::time::Duration, success: bool) {
        record_stage_duration(stage, elapsed, success);
        if let Some(agg) = &self.aggregator {
            if let Ok(mut agg) = agg.lock() {
                agg.record_stage(stage, elapsed, success);
            }
        }
    }

    /// Append to the run log; a log write failure never fails the run
    fn note(&self, run_id: RunId, message: &str) {
        if let Err(e) = self.logs.append(run_id, message) {
            warn!(run_id = %run_id, error = %e, "failed to append run log");
        }
    }
}

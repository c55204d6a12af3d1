//! Persisted records - Dataset, Run, RunStep
//!
//! A Run owns exactly three steps, created with it in [`StageName::ALL`]
//! order. Artifacts and metrics only grow by shallow merge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{DatasetId, RunId, StepId};

/// Free-form dataset metadata (ingestion provenance lives here)
pub type DatasetMeta = BTreeMap<String, serde_json::Value>;

/// Artifact paths produced by stages (key -> path)
pub type Artifacts = BTreeMap<String, String>;

/// Scalar metrics produced by the score stage
pub type Metrics = BTreeMap<String, f64>;

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Success,
    Failed,
    Canceled,
}

impl RunStatus {
    /// Whether the status is final
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Canceled)
    }

    /// Legal forward transitions. Anything else is rejected by the store.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Canceled)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Canceled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Whether the status is final
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }

    /// Legal forward transitions (monotonic, never out of a terminal state)
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Skipped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three fixed pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Prepare,
    Fit,
    Score,
}

impl StageName {
    /// Execution order
    pub const ALL: [StageName; 3] = [Self::Prepare, Self::Fit, Self::Score];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Fit => "fit",
            Self::Score => "score",
        }
    }

    /// Key under which the stage's output is merged into `Run::artifacts`
    pub fn artifact_key(self) -> &'static str {
        match self {
            Self::Prepare => "processed_path",
            Self::Fit => "model_path",
            Self::Score => "metrics_path",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prepare" => Ok(Self::Prepare),
            "fit" => Ok(Self::Fit),
            "score" => Ok(Self::Score),
            other => Err(format!("unknown stage '{other}'")),
        }
    }
}

/// A registered reference to one input file plus provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    pub source_path: String,
    #[serde(default)]
    pub meta: DatasetMeta,
    pub created_at: DateTime<Utc>,
}

/// One execution attempt of the pipeline against a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub dataset_id: DatasetId,
    pub model_type: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub artifacts: Artifacts,
    #[serde(default)]
    pub metrics: Metrics,
    pub error: Option<String>,
    /// Always three entries, in [`StageName::ALL`] order
    pub steps: Vec<RunStep>,
}

impl Run {
    /// Look up a step by stage
    pub fn step(&self, stage: StageName) -> Option<&RunStep> {
        self.steps.iter().find(|s| s.name == stage)
    }

    /// True when every step finished successfully
    pub fn all_steps_succeeded(&self) -> bool {
        self.steps.len() == StageName::ALL.len()
            && self.steps.iter().all(|s| s.status == StepStatus::Success)
    }

    /// True when at least one step failed
    pub fn any_step_failed(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

/// One stage of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStep {
    pub id: StepId,
    pub run_id: RunId,
    pub name: StageName,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_transitions_are_forward_only() {
        assert!(RunStatus::Queued.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Success.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Queued.can_transition_to(RunStatus::Success));
    }

    #[test]
    fn test_step_never_leaves_terminal() {
        for terminal in [StepStatus::Success, StepStatus::Failed, StepStatus::Skipped] {
            assert!(terminal.is_terminal());
            for next in [
                StepStatus::Pending,
                StepStatus::Running,
                StepStatus::Success,
                StepStatus::Failed,
                StepStatus::Skipped,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Canceled).unwrap(),
            "\"canceled\""
        );
        assert_eq!(
            serde_json::to_string(&StepStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_stage_order_and_keys() {
        let names: Vec<_> = StageName::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["prepare", "fit", "score"]);
        assert_eq!(StageName::Fit.artifact_key(), "model_path");
        assert_eq!("score".parse::<StageName>().unwrap(), StageName::Score);
        assert!("evaluate".parse::<StageName>().is_err());
    }
}

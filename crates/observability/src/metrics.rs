//! Dropzone metrics
//!
//! Thin wrappers over the `metrics` facade so metric names live in one place,
//! plus an in-memory aggregator used for the end-of-process summary.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{RunStatus, StageName};
use metrics::{counter, gauge, histogram};

/// Record a raw change notification from a change source
pub fn record_file_event(source: &str) {
    counter!("dropzone_file_events_total", "source" => source.to_string()).increment(1);
}

/// Record a notification dropped by the eligibility filter
pub fn record_file_ignored() {
    counter!("dropzone_file_events_ignored_total").increment(1);
}

/// Record the result of one candidate evaluation
///
/// `outcome` is the snake_case outcome label (`ingested`, `vanished`, ...).
pub fn record_candidate_outcome(outcome: &str) {
    counter!(
        "dropzone_candidates_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record how long a candidate waited for its size to settle
pub fn record_stability_wait(wait: Duration) {
    histogram!("dropzone_stability_wait_seconds").record(wait.as_secs_f64());
}

/// Record one stage invocation
pub fn record_stage_duration(stage: StageName, elapsed: Duration, success: bool) {
    let status = if success { "success" } else { "failure" };
    histogram!(
        "dropzone_stage_duration_seconds",
        "stage" => stage.as_str(),
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

/// Record a run reaching a terminal status
pub fn record_run_finished(status: RunStatus, elapsed: Duration) {
    counter!("dropzone_runs_finished_total", "status" => status.as_str()).increment(1);
    histogram!("dropzone_run_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record a run accepted onto the work queue
pub fn record_run_enqueued() {
    counter!("dropzone_runs_enqueued_total").increment(1);
}

/// Record the current work queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("dropzone_run_queue_depth").set(depth as f64);
}

/// Run metrics aggregator
///
/// Aggregates run outcomes in memory for summaries.
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    /// Terminal runs per status
    pub runs_by_status: BTreeMap<RunStatus, u64>,

    /// Whole-run durations
    pub run_duration: DurationStats,

    /// Per-stage durations
    pub stage_duration: BTreeMap<StageName, DurationStats>,

    /// Failures per stage
    pub stage_failures: BTreeMap<StageName, u64>,
}

impl RunMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one stage invocation
    pub fn record_stage(&mut self, stage: StageName, elapsed: Duration, success: bool) {
        self.stage_duration.entry(stage).or_default().push(elapsed);
        if !success {
            *self.stage_failures.entry(stage).or_insert(0) += 1;
        }
    }

    /// Add one finished run
    pub fn record_run(&mut self, status: RunStatus, elapsed: Duration) {
        *self.runs_by_status.entry(status).or_insert(0) += 1;
        self.run_duration.push(elapsed);
    }

    pub fn total_runs(&self) -> u64 {
        self.runs_by_status.values().sum()
    }

    pub fn summary(&self) -> RunSummary {
        let total = self.total_runs();
        let succeeded = self
            .runs_by_status
            .get(&RunStatus::Success)
            .copied()
            .unwrap_or(0);
        RunSummary {
            total_runs: total,
            runs_by_status: self.runs_by_status.clone(),
            success_rate: if total > 0 {
                succeeded as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            run_duration: self.run_duration,
            stage_duration: self.stage_duration.clone(),
            stage_failures: self.stage_failures.clone(),
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_runs: u64,
    pub runs_by_status: BTreeMap<RunStatus, u64>,
    pub success_rate: f64,
    pub run_duration: DurationStats,
    pub stage_duration: BTreeMap<StageName, DurationStats>,
    pub stage_failures: BTreeMap<StageName, u64>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Run Summary ===")?;
        writeln!(
            f,
            "Finished runs: {} ({:.2}% success)",
            self.total_runs, self.success_rate
        )?;
        for (status, count) in &self.runs_by_status {
            writeln!(f, "  {status}: {count}")?;
        }
        writeln!(f, "Run duration: {}", self.run_duration)?;
        for (stage, stats) in &self.stage_duration {
            let failures = self.stage_failures.get(stage).copied().unwrap_or(0);
            writeln!(f, "  {stage}: {stats}, failures={failures}")?;
        }
        Ok(())
    }
}

/// Count, total and extremes of a series of durations
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DurationStats {
    pub count: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl DurationStats {
    pub fn push(&mut self, elapsed: Duration) {
        if self.count == 0 {
            self.min = elapsed;
            self.max = elapsed;
        } else {
            self.min = self.min.min(elapsed);
            self.max = self.max.max(elapsed);
        }
        self.count += 1;
        self.total += elapsed;
    }

    pub fn mean(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64),
        }
    }
}

impl std::fmt::Display for DurationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "mean={:.3}s min={:.3}s max={:.3}s (n={})",
            self.mean().as_secs_f64(),
            self.min.as_secs_f64(),
            self.max.as_secs_f64(),
            self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_stats() {
        let mut stats = DurationStats::default();
        for ms in [300, 100, 200] {
            stats.push(Duration::from_millis(ms));
        }

        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean(), Duration::from_millis(200));
        assert_eq!(stats.min, Duration::from_millis(100));
        assert_eq!(stats.max, Duration::from_millis(300));
        assert_eq!(
            stats.to_string(),
            "mean=0.200s min=0.100s max=0.300s (n=3)"
        );
    }

    #[test]
    fn test_aggregator_summary() {
        let mut agg = RunMetricsAggregator::new();
        agg.record_stage(StageName::Prepare, Duration::from_millis(100), true);
        agg.record_stage(StageName::Fit, Duration::from_millis(300), false);
        agg.record_run(RunStatus::Failed, Duration::from_millis(400));
        agg.record_stage(StageName::Prepare, Duration::from_millis(200), true);
        agg.record_stage(StageName::Fit, Duration::from_millis(300), true);
        agg.record_stage(StageName::Score, Duration::from_millis(50), true);
        agg.record_run(RunStatus::Success, Duration::from_millis(550));

        let summary = agg.summary();
        assert_eq!(summary.total_runs, 2);
        assert!((summary.success_rate - 50.0).abs() < 1e-10);
        assert_eq!(summary.stage_failures.get(&StageName::Fit), Some(&1));
        assert_eq!(summary.stage_duration[&StageName::Prepare].count, 2);

        let text = summary.to_string();
        assert!(text.contains("Finished runs: 2"));
        assert!(text.contains("  fit: mean="));
    }

    #[test]
    fn test_empty_summary_displays_na() {
        let summary = RunMetricsAggregator::new().summary();
        assert_eq!(summary.success_rate, 0.0);
        assert!(summary.to_string().contains("N/A"));
    }

    #[test]
    fn test_recorders_without_installed_exporter() {
        // the facade is a no-op until a recorder is installed
        record_file_event("notify");
        record_candidate_outcome("ingested");
        record_stage_duration(StageName::Score, Duration::from_millis(5), true);
        record_run_finished(RunStatus::Success, Duration::from_secs(1));
        record_queue_depth(3);
    }
}

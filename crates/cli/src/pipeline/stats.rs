//! Service statistics printed on shutdown.

use std::time::Duration;

use dispatcher::DispatchSnapshot;
use ingestion::WatcherSnapshot;
use observability::RunSummary;

/// Statistics from one `serve` or `run` session
#[derive(Debug, Clone, Default)]
pub struct ServeStats {
    /// Wall time of the session
    pub duration: Duration,

    /// Watcher counters, when a watcher was running
    pub watcher: Option<WatcherSnapshot>,

    /// Dispatcher counters
    pub dispatch: DispatchSnapshot,

    /// Finished-run aggregation
    pub runs: RunSummary,
}

impl ServeStats {
    /// Finished runs per minute
    pub fn runs_per_minute(&self) -> f64 {
        let minutes = self.duration.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.runs.total_runs as f64 / minutes
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== dropzone session ===\n");
        println!("Overview");
        println!("   duration: {:.2}s", self.duration.as_secs_f64());
        println!("   runs/min: {:.2}", self.runs_per_minute());

        if let Some(watcher) = &self.watcher {
            println!("\nWatcher");
            println!("   events received: {}", watcher.events_received);
            println!("   events ignored: {}", watcher.events_ignored);
            println!("   candidates: {} (folded {})", watcher.candidates_scheduled, watcher.coalesced);
            println!("   ingested: {}", watcher.ingested);
            println!("   awaiting sentinel: {}", watcher.awaiting_sentinel);
            println!("   vanished: {}", watcher.vanished);
            println!(
                "   failures: fingerprint={} registration={} run={}",
                watcher.fingerprint_failed, watcher.registration_failed, watcher.run_creation_failed
            );
        }

        println!("\nDispatcher");
        println!("   {}", self.dispatch);

        println!("\n{}", self.runs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_per_minute() {
        let mut stats = ServeStats {
            duration: Duration::from_secs(120),
            ..ServeStats::default()
        };
        stats.runs.total_runs = 6;
        assert!((stats.runs_per_minute() - 3.0).abs() < 1e-9);

        stats.duration = Duration::ZERO;
        assert_eq!(stats.runs_per_minute(), 0.0);
    }
}

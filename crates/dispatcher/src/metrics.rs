//! Dispatcher counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Shared counters for the run queue and its workers
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Approximate queue length
    queue_len: AtomicUsize,
    /// Runs accepted onto the queue
    enqueued: AtomicU64,
    /// Runs handed to the executor
    executed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    /// Not queued (or unknown) when picked up
    skipped: AtomicU64,
    /// Picked up while another worker held the claim
    duplicate_claims: AtomicU64,
    /// Executor returned an error
    errors: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_duplicate_claims(&self) {
        self.duplicate_claims.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            queue_len: self.queue_len(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            duplicate_claims: self.duplicate_claims.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub queue_len: usize,
    pub enqueued: u64,
    pub executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub duplicate_claims: u64,
    pub errors: u64,
}

impl std::fmt::Display for DispatchSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "enqueued={} executed={} succeeded={} failed={} skipped={} duplicate_claims={} errors={}",
            self.enqueued,
            self.executed,
            self.succeeded,
            self.failed,
            self.skipped,
            self.duplicate_claims,
            self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let m = DispatchMetrics::new();
        m.inc_enqueued();
        m.inc_enqueued();
        m.inc_executed();
        m.inc_succeeded();
        m.set_queue_len(1);

        let snap = m.snapshot();
        assert_eq!(snap.enqueued, 2);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.queue_len, 1);
        assert!(snap.to_string().starts_with("enqueued=2 executed=1"));
    }
}

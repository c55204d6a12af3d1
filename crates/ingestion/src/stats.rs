//! Candidate outcomes and watcher counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{DatasetId, RunId};

/// Result of evaluating one candidate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// Registered, with the run created when auto-run is on
    Ingested {
        dataset_id: DatasetId,
        run_id: Option<RunId>,
    },
    /// Sentinel mode and no `.done` file yet
    AwaitingSentinel,
    /// Disappeared before it settled, or not a regular file
    Vanished,
    FingerprintFailed,
    RegistrationFailed,
    /// Dataset registered but the run could not be created
    RunCreationFailed { dataset_id: DatasetId },
}

impl CandidateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ingested { .. } => "ingested",
            Self::AwaitingSentinel => "awaiting_sentinel",
            Self::Vanished => "vanished",
            Self::FingerprintFailed => "fingerprint_failed",
            Self::RegistrationFailed => "registration_failed",
            Self::RunCreationFailed { .. } => "run_creation_failed",
        }
    }
}

/// Watcher counters
#[derive(Debug, Default)]
pub struct WatcherStats {
    events_received: AtomicU64,
    events_ignored: AtomicU64,
    candidates_scheduled: AtomicU64,
    coalesced: AtomicU64,
    ingested: AtomicU64,
    awaiting_sentinel: AtomicU64,
    vanished: AtomicU64,
    fingerprint_failed: AtomicU64,
    registration_failed: AtomicU64,
    run_creation_failed: AtomicU64,
}

impl WatcherStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scheduled(&self) {
        self.candidates_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// A ready notification folded into an in-flight candidate
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: &CandidateOutcome) {
        let counter = match outcome {
            CandidateOutcome::Ingested { .. } => &self.ingested,
            CandidateOutcome::AwaitingSentinel => &self.awaiting_sentinel,
            CandidateOutcome::Vanished => &self.vanished,
            CandidateOutcome::FingerprintFailed => &self.fingerprint_failed,
            CandidateOutcome::RegistrationFailed => &self.registration_failed,
            CandidateOutcome::RunCreationFailed { .. } => &self.run_creation_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WatcherSnapshot {
        WatcherSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            candidates_scheduled: self.candidates_scheduled.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            ingested: self.ingested.load(Ordering::Relaxed),
            awaiting_sentinel: self.awaiting_sentinel.load(Ordering::Relaxed),
            vanished: self.vanished.load(Ordering::Relaxed),
            fingerprint_failed: self.fingerprint_failed.load(Ordering::Relaxed),
            registration_failed: self.registration_failed.load(Ordering::Relaxed),
            run_creation_failed: self.run_creation_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherSnapshot {
    pub events_received: u64,
    pub events_ignored: u64,
    pub candidates_scheduled: u64,
    pub coalesced: u64,
    pub ingested: u64,
    pub awaiting_sentinel: u64,
    pub vanished: u64,
    pub fingerprint_failed: u64,
    pub registration_failed: u64,
    pub run_creation_failed: u64,
}

impl WatcherSnapshot {
    /// Candidates that finished, whatever the outcome
    pub fn completed(&self) -> u64 {
        self.ingested
            + self.awaiting_sentinel
            + self.vanished
            + self.fingerprint_failed
            + self.registration_failed
            + self.run_creation_failed
    }
}

impl fmt::Display for WatcherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "events={} ignored={} scheduled={} coalesced={} ingested={} awaiting_sentinel={} vanished={} failed(fingerprint={} register={} run={})",
            self.events_received,
            self.events_ignored,
            self.candidates_scheduled,
            self.coalesced,
            self.ingested,
            self.awaiting_sentinel,
            self.vanished,
            self.fingerprint_failed,
            self.registration_failed,
            self.run_creation_failed,
        )
    }
}

//! # Ingestion
//!
//! File ingestion watcher: observes a drop directory and registers every
//! settled eligible file as a dataset, optionally starting a run for it.
//!
//! Responsibilities:
//! - Receive raw change notifications ([`sources`])
//! - Filter by name ([`Eligibility`]) and debounce per path
//! - Wait for size stability, honour `.done` sentinels
//! - Fingerprint (size, mtime, SHA-256) and call the [`contracts::IngestBoundary`]
//!
//! # Example
//!
//! ```ignore
//! let watcher = IngestWatcher::new(config.watcher.clone(), Arc::new(boundary));
//! let handle = watcher.start(change_source_for(&config.watcher))?;
//! // ...
//! let stats = handle.shutdown().await;
//! ```

mod debounce;
mod eligibility;
mod error;
mod fingerprint;
pub mod sources;
mod stability;
mod stats;
mod watcher;

pub use debounce::Debouncer;
pub use eligibility::{companion_of, is_sentinel, sentinel_for, Eligibility, SENTINEL_SUFFIX};
pub use error::{IngestionError, Result};
pub use fingerprint::{fingerprint, registration_for, sha256_file, Fingerprint, CHUNK_SIZE, META_SOURCE};
pub use sources::{change_source_for, NotifyChangeSource, PollingChangeSource};
pub use stability::wait_until_stable;
pub use stats::{CandidateOutcome, WatcherSnapshot, WatcherStats};
pub use watcher::{IngestWatcher, WatcherHandle};

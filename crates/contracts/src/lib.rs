//! # Contracts
//!
//! Frozen interface contracts shared by every dropzone crate: the persisted
//! records, their status machines, configuration types and the traits at each
//! component seam. Business crates depend on this crate, never the reverse.
//!
//! ## Seams
//! - [`RunStore`]: record storage used by the run engine and boundaries
//! - [`Stages`]: the three opaque pipeline stage functions
//! - [`IngestBoundary`]: registration/enqueue surface called by the watcher
//! - [`ChangeSource`]: raw filesystem change notifications

mod boundary;
mod change_source;
mod config;
mod error;
mod ids;
mod records;
mod stage;
mod store;

pub use boundary::*;
pub use change_source::{ChangeSource, WatchEvent, WatchEventCallback, WatchEventKind};
pub use config::*;
pub use error::*;
pub use ids::{DatasetId, RunId, StepId};
pub use records::*;
pub use stage::*;
pub use store::*;

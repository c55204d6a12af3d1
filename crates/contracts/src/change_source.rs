//! ChangeSource trait - filesystem change notification abstraction
//!
//! Decouples the ingestion watcher from how changes are observed: native OS
//! notifications and periodic directory scans implement the same interface.

use std::path::PathBuf;
use std::sync::Arc;

use crate::ContractError;

/// Kind of observed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// A new file appeared
    Created,
    /// File content or metadata changed
    Modified,
    /// A file was renamed/moved to this path
    MovedTo,
}

/// One raw change notification for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Change callback type
///
/// Sources invoke it from their own thread; it must not block.
pub type WatchEventCallback = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// Change source trait
///
/// Directory events are filtered out by the source; file events are delivered
/// as-is (eligibility is decided downstream).
pub trait ChangeSource: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Start delivering events to `callback`.
    ///
    /// Repeated calls while listening are no-ops.
    ///
    /// # Errors
    /// [`ContractError::ChangeSource`] when the underlying watch cannot start
    fn listen(&self, callback: WatchEventCallback) -> Result<(), ContractError>;

    /// Stop delivering events
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

//! Per-path debounce map
//!
//! Owned by the watcher coordinator; never shared.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Record a notification; the latest one wins.
    ///
    /// Returns `true` when the path was already pending.
    pub fn mark(&mut self, path: PathBuf, now: Instant) -> bool {
        self.pending.insert(path, now).is_some()
    }

    /// Remove and return every path quiet for at least the window, oldest
    /// first
    pub fn drain_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<(PathBuf, Instant)> = self
            .pending
            .iter()
            .filter(|(_, &last)| now.saturating_duration_since(last) >= self.window)
            .map(|(p, &last)| (p.clone(), last))
            .collect();
        for (path, _) in &ready {
            self.pending.remove(path);
        }
        ready.sort_by_key(|(_, last)| *last);
        ready.into_iter().map(|(p, _)| p).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

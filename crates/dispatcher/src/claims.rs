//! At-most-one executor per run id

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use contracts::RunId;

/// Set of run ids currently being executed
#[derive(Debug, Clone, Default)]
pub struct RunClaims {
    active: Arc<Mutex<HashSet<RunId>>>,
}

impl RunClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `run_id`; `None` when another holder already has it
    pub fn try_claim(&self, run_id: RunId) -> Option<RunClaim> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(run_id) {
            return None;
        }
        Some(RunClaim {
            run_id,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_claimed(&self, run_id: RunId) -> bool {
        self.active
            .lock()
            .map(|a| a.contains(&run_id))
            .unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or(0)
    }
}

/// Exclusive right to execute one run; released on drop (including unwind)
#[derive(Debug)]
pub struct RunClaim {
    run_id: RunId,
    active: Arc<Mutex<HashSet<RunId>>>,
}

impl RunClaim {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        active.remove(&self.run_id);
    }
}

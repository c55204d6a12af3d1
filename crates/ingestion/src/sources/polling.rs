//! Periodic directory scans, for mounts without native notifications

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use contracts::{ChangeSource, ContractError, WatchEvent, WatchEventCallback, WatchEventKind};
use tracing::{debug, warn};

pub const POLLING_SOURCE_NAME: &str = "polling";

type Snapshot = HashMap<PathBuf, (u64, Option<SystemTime>)>;

/// Compares (size, mtime) snapshots of one directory. The first scan is a
/// silent baseline.
pub struct PollingChangeSource {
    root: PathBuf,
    interval: Duration,
    listening: Arc<AtomicBool>,
}

impl PollingChangeSource {
    pub fn new(root: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            root: root.into(),
            interval,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

fn scan(root: &Path) -> std::io::Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    for entry in std::fs::read_dir(root)? {
        let Ok(entry) = entry else { continue };
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        snapshot.insert(entry.path(), (meta.len(), meta.modified().ok()));
    }
    Ok(snapshot)
}

/// Events turning `before` into `after`; removals are not reported
fn diff(before: &Snapshot, after: &Snapshot) -> Vec<WatchEvent> {
    let mut events: Vec<WatchEvent> = after
        .iter()
        .filter_map(|(path, state)| match before.get(path) {
            None => Some(WatchEvent::new(path.clone(), WatchEventKind::Created)),
            Some(old) if old != state => {
                Some(WatchEvent::new(path.clone(), WatchEventKind::Modified))
            }
            Some(_) => None,
        })
        .collect();
    events.sort_by(|a, b| a.path.cmp(&b.path));
    events
}

impl ChangeSource for PollingChangeSource {
    fn name(&self) -> &str {
        POLLING_SOURCE_NAME
    }

    fn listen(&self, callback: WatchEventCallback) -> Result<(), ContractError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let baseline = match scan(&self.root) {
            Ok(s) => s,
            Err(e) => {
                self.listening.store(false, Ordering::SeqCst);
                return Err(ContractError::change_source(
                    POLLING_SOURCE_NAME,
                    format!("cannot scan {}: {e}", self.root.display()),
                ));
            }
        };

        let root = self.root.clone();
        let interval = self.interval;
        let listening = self.listening.clone();
        debug!(root = %root.display(), files = baseline.len(), ?interval, "polling source listening");

        thread::spawn(move || {
            let mut previous = baseline;
            while listening.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if !listening.load(Ordering::Relaxed) {
                    break;
                }
                match scan(&root) {
                    Ok(current) => {
                        for event in diff(&previous, &current) {
                            callback(event);
                        }
                        previous = current;
                    }
                    Err(e) => warn!(root = %root.display(), error = %e, "directory scan failed"),
                }
            }
            debug!(root = %root.display(), "polling source stopped");
        });
        Ok(())
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    #[test]
    fn test_diff() {
        let t = SystemTime::UNIX_EPOCH;
        let before = Snapshot::from([
            (PathBuf::from("/in/a.csv"), (1, Some(t))),
            (PathBuf::from("/in/b.csv"), (1, Some(t))),
            (PathBuf::from("/in/gone.csv"), (1, Some(t))),
        ]);
        let after = Snapshot::from([
            (PathBuf::from("/in/a.csv"), (1, Some(t))),
            (PathBuf::from("/in/b.csv"), (2, Some(t))),
            (PathBuf::from("/in/c.csv"), (1, Some(t))),
        ]);
        assert_eq!(
            diff(&before, &after),
            vec![
                WatchEvent::new("/in/b.csv", WatchEventKind::Modified),
                WatchEvent::new("/in/c.csv", WatchEventKind::Created),
            ]
        );
    }

    #[test]
    fn test_baseline_is_silent_and_new_files_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.csv"), "x\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let source = PollingChangeSource::new(dir.path(), Duration::from_millis(20));
        let seen = Arc::new(Mutex::new(Vec::<WatchEvent>::new()));
        let sink = seen.clone();
        source
            .listen(Arc::new(move |ev| sink.lock().unwrap().push(ev)))
            .unwrap();

        thread::sleep(Duration::from_millis(60));
        fs::write(dir.path().join("new.csv"), "y\n").unwrap();
        thread::sleep(Duration::from_millis(120));
        source.stop();

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|e| !e.path.ends_with("old.csv")));
        assert!(seen.iter().all(|e| !e.path.ends_with("sub")));
        assert!(seen
            .iter()
            .any(|e| e.path.ends_with("new.csv") && e.kind == WatchEventKind::Created));
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = PollingChangeSource::new(dir.path().join("absent"), Duration::from_secs(1));
        assert!(source.listen(Arc::new(|_| {})).is_err());
        assert!(!source.is_listening());
    }
}

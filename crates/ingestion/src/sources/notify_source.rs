//! Native OS notifications through the `notify` crate

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{ChangeSource, ContractError, WatchEvent, WatchEventCallback, WatchEventKind};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

pub const NOTIFY_SOURCE_NAME: &str = "notify";

/// Non-recursive watch on one directory
pub struct NotifyChangeSource {
    root: PathBuf,
    watcher: Mutex<Option<RecommendedWatcher>>,
    listening: Arc<AtomicBool>,
}

impl NotifyChangeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            watcher: Mutex::new(None),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Map one notify event to watch events; directories and removals are dropped
fn translate(event: &Event) -> Vec<WatchEvent> {
    let (kind, paths): (WatchEventKind, &[PathBuf]) = match &event.kind {
        EventKind::Create(_) => (WatchEventKind::Created, event.paths.as_slice()),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            (WatchEventKind::MovedTo, event.paths.as_slice())
        }
        // paths are [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            (WatchEventKind::MovedTo, event.paths.get(1..).unwrap_or_default())
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => return Vec::new(),
        // platforms that cannot tell the direction of a rename
        EventKind::Modify(ModifyKind::Name(_)) => {
            (WatchEventKind::MovedTo, event.paths.as_slice())
        }
        EventKind::Modify(_) => (WatchEventKind::Modified, event.paths.as_slice()),
        _ => return Vec::new(),
    };

    paths
        .iter()
        .filter(|p| !p.is_dir())
        .map(|p| WatchEvent::new(p.clone(), kind))
        .collect()
}

impl ChangeSource for NotifyChangeSource {
    fn name(&self) -> &str {
        NOTIFY_SOURCE_NAME
    }

    fn listen(&self, callback: WatchEventCallback) -> Result<(), ContractError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let listening = self.listening.clone();
        let handler = move |res: notify::Result<Event>| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }
            match res {
                Ok(event) => {
                    for ev in translate(&event) {
                        trace!(path = %ev.path.display(), kind = ?ev.kind, "notify event");
                        callback(ev);
                    }
                }
                Err(e) => warn!(error = %e, "notify watcher error"),
            }
        };

        let started = notify::recommended_watcher(handler).and_then(|mut watcher| {
            watcher.watch(Path::new(&self.root), RecursiveMode::NonRecursive)?;
            Ok(watcher)
        });
        let watcher = match started {
            Ok(w) => w,
            Err(e) => {
                self.listening.store(false, Ordering::SeqCst);
                return Err(ContractError::change_source(NOTIFY_SOURCE_NAME, e.to_string()));
            }
        };

        if let Ok(mut slot) = self.watcher.lock() {
            *slot = Some(watcher);
        }
        debug!(root = %self.root.display(), "notify source listening");
        Ok(())
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            if let Ok(mut slot) = self.watcher.lock() {
                // dropping the watcher ends the OS watch
                slot.take();
            }
            debug!(root = %self.root.display(), "notify source stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    #[test]
    fn test_translate_kinds() {
        let created = translate(&event(EventKind::Create(CreateKind::File), &["/in/a.csv"]));
        assert_eq!(created, vec![WatchEvent::new("/in/a.csv", WatchEventKind::Created)]);

        let modified = translate(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/in/a.csv"],
        ));
        assert_eq!(modified[0].kind, WatchEventKind::Modified);

        let moved = translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/in/a.tmp", "/in/a.csv"],
        ));
        assert_eq!(moved, vec![WatchEvent::new("/in/a.csv", WatchEventKind::MovedTo)]);

        assert!(translate(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/in/a.csv"]
        ))
        .is_empty());
        assert!(translate(&event(EventKind::Remove(RemoveKind::File), &["/in/a.csv"])).is_empty());
    }

    #[test]
    fn test_directory_events_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        let e = event(EventKind::Create(CreateKind::Any), &[sub.to_str().unwrap()]);
        assert!(translate(&e).is_empty());
    }

    #[test]
    fn test_listen_reports_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = NotifyChangeSource::new(dir.path());
        let seen = Arc::new(Mutex::new(Vec::<WatchEvent>::new()));
        let sink = seen.clone();
        source
            .listen(Arc::new(move |ev| sink.lock().unwrap().push(ev)))
            .unwrap();
        assert!(source.is_listening());

        let file = dir.path().join("new.csv");
        std::fs::write(&file, "a,b\n").unwrap();

        let mut found = false;
        for _ in 0..40 {
            std::thread::sleep(Duration::from_millis(50));
            if seen.lock().unwrap().iter().any(|e| e.path.file_name() == file.file_name()) {
                found = true;
                break;
            }
        }
        source.stop();
        assert!(found, "no event for {}", file.display());
        assert!(!source.is_listening());
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = NotifyChangeSource::new(dir.path().join("absent"));
        let err = source.listen(Arc::new(|_| {})).unwrap_err();
        assert!(matches!(err, ContractError::ChangeSource { .. }));
        assert!(!source.is_listening());
    }
}

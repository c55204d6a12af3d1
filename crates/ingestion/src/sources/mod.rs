//! [`ChangeSource`] implementations

mod notify_source;
mod polling;

pub use notify_source::{NotifyChangeSource, NOTIFY_SOURCE_NAME};
pub use polling::{PollingChangeSource, POLLING_SOURCE_NAME};

use contracts::{ChangeSource, ChangeSourceKind, WatcherConfig};

/// Change source for the configured backend, watching `watch_root`
pub fn change_source_for(config: &WatcherConfig) -> Box<dyn ChangeSource> {
    match config.source {
        ChangeSourceKind::Notify => Box::new(NotifyChangeSource::new(&config.watch_root)),
        ChangeSourceKind::Polling => Box::new(PollingChangeSource::new(
            &config.watch_root,
            config.scan_interval(),
        )),
    }
}

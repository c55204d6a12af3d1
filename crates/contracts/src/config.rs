//! ServiceConfig - Config Loader output
//!
//! One explicit configuration value built at startup and passed by reference
//! into every component. Defaults mirror the reference deployment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Root for `logs/` and `runs/`
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// File ingestion watcher
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Registration/enqueue boundary
    #[serde(default)]
    pub boundary: BoundaryConfig,

    /// Run execution workers
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            data_root: default_data_root(),
            watcher: WatcherConfig::default(),
            boundary: BoundaryConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("/data")
}

/// How file changes are observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSourceKind {
    /// Native OS notifications
    #[default]
    Notify,
    /// Periodic directory scans (network mounts)
    Polling,
}

/// Watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Directory to observe (non-recursive)
    pub watch_root: PathBuf,

    /// Allowed extensions with leading dot; empty = any
    pub include_ext: Vec<String>,

    /// File name suffixes that are never eligible
    pub ignore_suffixes: Vec<String>,

    /// Size must stay unchanged this long before a file is stable
    pub stability_window_secs: f64,

    /// Size polling interval during the stability wait
    pub poll_interval_secs: f64,

    /// Quiet period that collapses repeated notifications
    pub debounce_secs: f64,

    /// How often the coordinator flushes ready candidates
    pub flush_interval_secs: f64,

    /// Only evaluate `<file>.done`-gated files
    pub require_done_file: bool,

    /// Create a run after successful registration
    pub auto_run: bool,

    /// Variant tag used for auto-created runs
    pub default_variant: String,

    /// Change notification backend
    pub source: ChangeSourceKind,

    /// Scan interval for the polling backend
    pub scan_interval_secs: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_root: PathBuf::from("/data/inbound"),
            include_ext: vec![".csv".into(), ".parquet".into(), ".json".into()],
            ignore_suffixes: vec![".tmp".into(), ".partial".into()],
            stability_window_secs: 10.0,
            poll_interval_secs: 1.0,
            debounce_secs: 2.0,
            flush_interval_secs: 1.0,
            require_done_file: false,
            auto_run: true,
            default_variant: "baseline".into(),
            source: ChangeSourceKind::Notify,
            scan_interval_secs: 2.0,
        }
    }
}

impl WatcherConfig {
    pub fn stability_window(&self) -> Duration {
        Duration::from_secs_f64(self.stability_window_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs_f64(self.flush_interval_secs)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs_f64(self.scan_interval_secs)
    }
}

/// Boundary transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Store and dispatcher in the same process
    #[default]
    InProcess,
    /// Remote JSON API
    Http,
}

/// Boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub mode: BoundaryMode,

    /// API base, e.g. `http://api:8000/api`
    pub base_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            mode: BoundaryMode::InProcess,
            base_url: "http://api:8000/api".into(),
            timeout_secs: 30,
        }
    }
}

impl BoundaryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Concurrent run workers
    pub workers: usize,

    /// Bounded run queue capacity
    pub queue_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.data_root, PathBuf::from("/data"));
        assert_eq!(cfg.watcher.watch_root, PathBuf::from("/data/inbound"));
        assert_eq!(cfg.watcher.stability_window(), Duration::from_secs(10));
        assert_eq!(cfg.watcher.debounce(), Duration::from_secs(2));
        assert!(cfg.watcher.auto_run);
        assert!(!cfg.watcher.require_done_file);
        assert_eq!(cfg.boundary.mode, BoundaryMode::InProcess);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let cfg: ServiceConfig = toml::from_str(
            r#"
data_root = "/srv/dz"

[watcher]
stability_window_secs = 3
source = "polling"
"#,
        )
        .unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/srv/dz"));
        assert_eq!(cfg.watcher.stability_window_secs, 3.0);
        assert_eq!(cfg.watcher.source, ChangeSourceKind::Polling);
        assert_eq!(cfg.watcher.poll_interval_secs, 1.0);
        assert_eq!(cfg.executor.workers, 2);
    }
}

//! Environment overrides
//!
//! Applied after the file is parsed and before validation. Variable names
//! match the ones the watcher container has always been deployed with.

use contracts::{BoundaryMode, ContractError, ServiceConfig};
use std::path::PathBuf;
use tracing::debug;

pub const DATA_ROOT: &str = "DATA_ROOT";
pub const WATCH_DIR: &str = "WATCH_DIR";
pub const API_BASE: &str = "API_BASE";
pub const STABLE_SECONDS: &str = "STABLE_SECONDS";
pub const POLL_INTERVAL: &str = "POLL_INTERVAL";
pub const AUTO_RUN: &str = "AUTO_RUN";
pub const INCLUDE_EXT: &str = "INCLUDE_EXT";
pub const IGNORE_SUFFIX: &str = "IGNORE_SUFFIX";
pub const USE_DONE_FILE: &str = "USE_DONE_FILE";

/// Apply overrides from `lookup` (normally `std::env::var`)
pub fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ContractError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(DATA_ROOT) {
        debug!(value = %v, "override data_root from {DATA_ROOT}");
        config.data_root = PathBuf::from(v);
    }
    if let Some(v) = lookup(WATCH_DIR) {
        debug!(value = %v, "override watcher.watch_root from {WATCH_DIR}");
        config.watcher.watch_root = PathBuf::from(v);
    }
    if let Some(v) = lookup(API_BASE) {
        debug!(value = %v, "override boundary.base_url from {API_BASE}");
        config.boundary.base_url = v.trim_end_matches('/').to_string();
        config.boundary.mode = BoundaryMode::Http;
    }
    if let Some(v) = lookup(STABLE_SECONDS) {
        config.watcher.stability_window_secs = parse_f64(STABLE_SECONDS, &v)?;
    }
    if let Some(v) = lookup(POLL_INTERVAL) {
        config.watcher.poll_interval_secs = parse_f64(POLL_INTERVAL, &v)?;
    }
    if let Some(v) = lookup(AUTO_RUN) {
        config.watcher.auto_run = parse_flag(&v);
    }
    if let Some(v) = lookup(INCLUDE_EXT) {
        config.watcher.include_ext = split_list(&v, true);
    }
    if let Some(v) = lookup(IGNORE_SUFFIX) {
        config.watcher.ignore_suffixes = split_list(&v, false);
    }
    if let Some(v) = lookup(USE_DONE_FILE) {
        config.watcher.require_done_file = parse_flag(&v);
    }
    Ok(())
}

/// `1`, `true`, `yes`, `y` (any case) are true; everything else is false
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ContractError> {
    value.trim().parse::<f64>().map_err(|e| ContractError::ConfigParse {
        message: format!("{key}: expected a number, got '{value}'"),
        source: Some(Box::new(e)),
    })
}

fn split_list(value: &str, lowercase: bool) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if lowercase {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut cfg = ServiceConfig::default();
        apply_overrides(
            &mut cfg,
            lookup(&[
                (WATCH_DIR, "/mnt/nas/in"),
                (API_BASE, "http://api:9000/api/"),
                (STABLE_SECONDS, "3"),
                (POLL_INTERVAL, "0.25"),
                (AUTO_RUN, "No"),
                (INCLUDE_EXT, ".CSV, .json,,"),
                (IGNORE_SUFFIX, ".tmp,.crdownload"),
                (USE_DONE_FILE, "Y"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.watcher.watch_root, PathBuf::from("/mnt/nas/in"));
        assert_eq!(cfg.boundary.base_url, "http://api:9000/api");
        assert_eq!(cfg.boundary.mode, BoundaryMode::Http);
        assert_eq!(cfg.watcher.stability_window_secs, 3.0);
        assert_eq!(cfg.watcher.poll_interval_secs, 0.25);
        assert!(!cfg.watcher.auto_run);
        assert_eq!(cfg.watcher.include_ext, vec![".csv", ".json"]);
        assert_eq!(cfg.watcher.ignore_suffixes, vec![".tmp", ".crdownload"]);
        assert!(cfg.watcher.require_done_file);
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut cfg = ServiceConfig::default();
        let before = cfg.watcher.include_ext.clone();
        apply_overrides(&mut cfg, |_| None).unwrap();
        assert_eq!(cfg.watcher.include_ext, before);
        assert_eq!(cfg.boundary.mode, BoundaryMode::InProcess);
    }

    #[test]
    fn test_bad_number_is_parse_error() {
        let mut cfg = ServiceConfig::default();
        let err = apply_overrides(&mut cfg, lookup(&[(STABLE_SECONDS, "ten")])).unwrap_err();
        assert!(err.to_string().contains(STABLE_SECONDS));
    }

    #[test]
    fn test_parse_flag() {
        for v in ["1", "true", "TRUE", "yes", "y"] {
            assert!(parse_flag(v), "{v}");
        }
        for v in ["0", "false", "off", ""] {
            assert!(!parse_flag(v), "{v}");
        }
    }
}

//! Configuration parsing
//!
//! TOML (primary) and JSON.

use contracts::{ContractError, ServiceConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<ServiceConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<ServiceConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BoundaryMode, ChangeSourceKind};
    use std::path::PathBuf;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
data_root = "/srv/dropzone"

[watcher]
watch_root = "/srv/dropzone/inbound"
include_ext = [".csv"]
ignore_suffixes = [".tmp", ".part"]
stability_window_secs = 5
poll_interval_secs = 0.5
require_done_file = true
auto_run = false
source = "polling"

[boundary]
mode = "http"
base_url = "http://localhost:8000/api"

[executor]
workers = 4
"#;
        let cfg = parse_toml(content).unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/srv/dropzone"));
        assert_eq!(cfg.watcher.include_ext, vec![".csv".to_string()]);
        assert!(cfg.watcher.require_done_file);
        assert!(!cfg.watcher.auto_run);
        assert_eq!(cfg.watcher.source, ChangeSourceKind::Polling);
        assert_eq!(cfg.boundary.mode, BoundaryMode::Http);
        assert_eq!(cfg.executor.workers, 4);
        assert_eq!(cfg.executor.queue_capacity, 64);
    }

    #[test]
    fn test_parse_json_minimal() {
        let cfg = parse_json(r#"{ "data_root": "/tmp/dz", "watcher": { "debounce_secs": 1.0 } }"#)
            .unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/tmp/dz"));
        assert_eq!(cfg.watcher.debounce_secs, 1.0);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}

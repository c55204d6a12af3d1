//! # Config Loader
//!
//! Builds the single [`ServiceConfig`] value used by every dropzone
//! component.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply environment overrides (`WATCH_DIR`, `API_BASE`, ...)
//! - Validate configuration legality
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load(Some(Path::new("dropzone.toml"))).unwrap();
//! println!("Watching: {}", config.watcher.watch_root.display());
//! ```

pub mod env;
mod parser;
mod validator;

pub use contracts::ServiceConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::info;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the effective configuration for a process
    ///
    /// Starts from the file when given (defaults otherwise), applies the
    /// process environment, then validates.
    ///
    /// # Errors
    /// - File read / parse failure
    /// - Malformed environment value
    /// - Validation failure
    pub fn load(path: Option<&Path>) -> Result<ServiceConfig, ContractError> {
        Self::load_with_lookup(path, |key| std::env::var(key).ok())
    }

    /// [`ConfigLoader::load`] with an explicit environment lookup
    pub fn load_with_lookup<F>(path: Option<&Path>, lookup: F) -> Result<ServiceConfig, ContractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let format = Self::detect_format(path)?;
                let content = Self::read_file(path)?;
                parser::parse(&content, format)?
            }
            None => ServiceConfig::default(),
        };
        env::apply_overrides(&mut config, lookup)?;
        validator::validate(&config)?;

        info!(
            watch_root = %config.watcher.watch_root.display(),
            data_root = %config.data_root.display(),
            boundary = ?config.boundary.mode,
            auto_run = config.watcher.auto_run,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration from file path (no environment overrides)
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ServiceConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize ServiceConfig to TOML string
    pub fn to_toml(config: &ServiceConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ServiceConfig to JSON string
    pub fn to_json(config: &ServiceConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BoundaryMode;
    use std::io::Write;
    use std::path::PathBuf;

    const SAMPLE_TOML: &str = r#"
data_root = "/srv/dropzone"

[watcher]
watch_root = "/srv/dropzone/inbound"
stability_window_secs = 5
include_ext = [".csv"]

[executor]
workers = 4
"#;

    #[test]
    fn test_load_from_str_toml() {
        let cfg = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(cfg.watcher.watch_root, PathBuf::from("/srv/dropzone/inbound"));
        assert_eq!(cfg.executor.workers, 4);
    }

    #[test]
    fn test_round_trip_toml() {
        let cfg = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&cfg).unwrap();
        let cfg2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(cfg.watcher.include_ext, cfg2.watcher.include_ext);
        assert_eq!(cfg.data_root, cfg2.data_root);
    }

    #[test]
    fn test_round_trip_json() {
        let cfg = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&cfg).unwrap();
        let cfg2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(cfg.watcher.stability_window_secs, cfg2.watcher.stability_window_secs);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[executor]
workers = 0
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("executor.workers"));
    }

    #[test]
    fn test_load_file_then_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let cfg = ConfigLoader::load_with_lookup(Some(file.path()), |key| match key {
            "API_BASE" => Some("http://remote:8000/api".to_string()),
            "AUTO_RUN" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(cfg.watcher.stability_window_secs, 5.0);
        assert_eq!(cfg.boundary.mode, BoundaryMode::Http);
        assert_eq!(cfg.boundary.base_url, "http://remote:8000/api");
        assert!(!cfg.watcher.auto_run);
    }

    #[test]
    fn test_env_values_are_validated() {
        let err = ConfigLoader::load_with_lookup(None, |key| {
            (key == "POLL_INTERVAL").then(|| "60".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}

//! Configuration validation
//!
//! Rules:
//! - every duration is > 0
//! - poll_interval <= stability_window
//! - include_ext entries start with '.'
//! - ignore_suffixes entries are non-empty
//! - default_variant is non-empty
//! - executor workers and queue capacity are > 0
//! - http boundary mode has a base URL

use contracts::{BoundaryMode, ContractError, ServiceConfig, WatcherConfig};

/// Validate a ServiceConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_watcher_durations(&config.watcher)?;
    validate_watcher_filters(&config.watcher)?;
    validate_boundary(config)?;
    validate_executor(config)?;
    Ok(())
}

fn require_positive(field: &str, value: f64) -> Result<(), ContractError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(ContractError::config_validation(
            field,
            format!("must be > 0, got {value}"),
        ));
    }
    Ok(())
}

fn validate_watcher_durations(watcher: &WatcherConfig) -> Result<(), ContractError> {
    require_positive("watcher.stability_window_secs", watcher.stability_window_secs)?;
    require_positive("watcher.poll_interval_secs", watcher.poll_interval_secs)?;
    require_positive("watcher.debounce_secs", watcher.debounce_secs)?;
    require_positive("watcher.flush_interval_secs", watcher.flush_interval_secs)?;
    require_positive("watcher.scan_interval_secs", watcher.scan_interval_secs)?;

    if watcher.poll_interval_secs > watcher.stability_window_secs {
        return Err(ContractError::config_validation(
            "watcher.poll_interval_secs / watcher.stability_window_secs",
            format!(
                "poll_interval_secs ({}) must be <= stability_window_secs ({})",
                watcher.poll_interval_secs, watcher.stability_window_secs
            ),
        ));
    }
    Ok(())
}

fn validate_watcher_filters(watcher: &WatcherConfig) -> Result<(), ContractError> {
    for (idx, ext) in watcher.include_ext.iter().enumerate() {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ContractError::config_validation(
                format!("watcher.include_ext[{idx}]"),
                format!("extension '{ext}' must start with '.'"),
            ));
        }
    }
    for (idx, suffix) in watcher.ignore_suffixes.iter().enumerate() {
        if suffix.is_empty() {
            return Err(ContractError::config_validation(
                format!("watcher.ignore_suffixes[{idx}]"),
                "suffix cannot be empty",
            ));
        }
    }
    if watcher.default_variant.trim().is_empty() {
        return Err(ContractError::config_validation(
            "watcher.default_variant",
            "variant cannot be empty",
        ));
    }
    Ok(())
}

fn validate_boundary(config: &ServiceConfig) -> Result<(), ContractError> {
    let boundary = &config.boundary;
    if boundary.mode == BoundaryMode::Http && boundary.base_url.trim().is_empty() {
        return Err(ContractError::config_validation(
            "boundary.base_url",
            "http mode requires a base URL",
        ));
    }
    if boundary.timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "boundary.timeout_secs",
            "must be > 0",
        ));
    }
    Ok(())
}

fn validate_executor(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.executor.workers == 0 {
        return Err(ContractError::config_validation(
            "executor.workers",
            "at least one worker is required",
        ));
    }
    if config.executor.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "executor.queue_capacity",
            "queue capacity must be > 0",
        ));
    }
    Ok(())
}

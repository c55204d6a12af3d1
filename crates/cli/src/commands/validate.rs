//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BoundaryMode, ServiceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, ValidateArgs};
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    watch_root: String,
    data_root: String,
    change_source: String,
    boundary: String,
    api_base: String,
    auto_run: bool,
    require_done_file: bool,
    stability_window_secs: f64,
    workers: usize,
}

/// Execute the `validate` command
pub fn run_validate(cli: &Cli, args: &ValidateArgs) -> Result<()> {
    info!("Validating configuration");

    let result = validate_config(cli);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match result.error {
        None => Ok(()),
        Some(message) => Err(CliError::config_validation(message).into()),
    }
}

fn validate_config(cli: &Cli) -> ValidationResult {
    let config_path = cli.config.as_ref().map(|p| p.display().to_string());

    if let Some(path) = &cli.config {
        if !path.exists() {
            return ValidationResult {
                valid: false,
                config_path,
                error: Some(format!("File not found: {}", path.display())),
                warnings: None,
                summary: None,
            };
        }
    }

    match config_loader::ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    watch_root: config.watcher.watch_root.display().to_string(),
                    data_root: config.data_root.display().to_string(),
                    change_source: format!("{:?}", config.watcher.source).to_lowercase(),
                    boundary: format!("{:?}", config.boundary.mode).to_lowercase(),
                    api_base: config.boundary.base_url.clone(),
                    auto_run: config.watcher.auto_run,
                    require_done_file: config.watcher.require_done_file,
                    stability_window_secs: config.watcher.stability_window_secs,
                    workers: config.executor.workers,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Settings that are legal but probably not intended
fn collect_warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let watcher = &config.watcher;

    if watcher.include_ext.is_empty() {
        warnings.push("include_ext is empty: files with any extension are eligible".to_string());
    }
    if watcher.flush_interval_secs > watcher.debounce_secs {
        warnings.push(format!(
            "flush interval ({}s) exceeds debounce window ({}s): candidates start late",
            watcher.flush_interval_secs, watcher.debounce_secs
        ));
    }
    if config.boundary.mode == BoundaryMode::InProcess && !watcher.auto_run {
        warnings.push("auto_run is off: registered datasets are never executed".to_string());
    }
    warnings
}

fn print_validation_result(result: &ValidationResult) {
    let source = result.config_path.as_deref().unwrap_or("<defaults + environment>");
    if result.valid {
        println!("✓ Configuration is valid: {}", source);
    } else {
        println!("✗ Configuration is invalid: {}", source);
    }

    if let Some(error) = &result.error {
        println!("\nError: {}", error);
    }

    if let Some(summary) = &result.summary {
        println!("\nSummary:");
        println!("  Watch root: {}", summary.watch_root);
        println!("  Data root: {}", summary.data_root);
        println!("  Change source: {}", summary.change_source);
        println!("  Boundary: {} ({})", summary.boundary, summary.api_base);
        println!("  Auto run: {}", summary.auto_run);
        println!("  Sentinel mode: {}", summary.require_done_file);
        println!("  Stability window: {}s", summary.stability_window_secs);
        println!("  Workers: {}", summary.workers);
    }

    if let Some(warnings) = &result.warnings {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  ⚠ {}", warning);
        }
    }
}

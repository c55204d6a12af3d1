//! Command implementations.

mod logs;
mod run;
mod serve;
mod validate;
mod watch;

pub use logs::run_logs;
pub use run::run_once;
pub use serve::run_serve;
pub use validate::run_validate;
pub use watch::run_watch;

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use tracing::{info, warn};

use crate::cli::Cli;

/// Load file + environment configuration and validate it
fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    match &cli.config {
        Some(path) => info!(config = %path.display(), "Loading configuration"),
        None => info!("Loading configuration from defaults and environment"),
    }
    config_loader::ConfigLoader::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

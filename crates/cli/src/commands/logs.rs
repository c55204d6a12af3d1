//! `logs` command implementation.

use anyhow::{Context, Result};
use contracts::RunId;
use run_engine::{clamp_tail_lines, RunLog};
use tracing::warn;

use super::load_config;
use crate::cli::{Cli, LogsArgs};

/// Execute the `logs` command
pub fn run_logs(cli: &Cli, args: &LogsArgs) -> Result<()> {
    let config = load_config(cli)?;
    let run_id = RunId(args.run_id);
    let lines = clamp_tail_lines(args.lines);

    let log = RunLog::new(&config.data_root);
    let tail = log
        .tail(run_id, lines)
        .with_context(|| format!("Failed to read {}", log.path(run_id).display()))?;

    if tail.is_empty() {
        warn!(run_id = %run_id, path = %log.path(run_id).display(), "No log for run");
    } else {
        println!("{tail}");
    }
    Ok(())
}

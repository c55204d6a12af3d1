//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dropzone - register dropped data files and run the pipeline on them
#[derive(Parser, Debug)]
#[command(
    name = "dropzone",
    author,
    version,
    about = "Drop-folder ingestion and pipeline runner",
    long_about = "Watches a drop directory, registers every settled data file as a dataset\n\
                  and runs the prepare -> fit -> score pipeline on it."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DROPZONE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DROPZONE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Configuration file (TOML or JSON); defaults plus environment when omitted
    #[arg(short, long, global = true, env = "DROPZONE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "DROPZONE_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch, register and execute runs in this process
    Serve(ServeArgs),

    /// Watch only; register through the remote API
    Watch,

    /// Register one file and execute its run in the foreground
    Run(RunArgs),

    /// Print the tail of a run log
    Logs(LogsArgs),

    /// Validate configuration without running
    Validate(ValidateArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Override the number of run workers
    #[arg(long, env = "DROPZONE_WORKERS")]
    pub workers: Option<usize>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Data file to register
    pub file: PathBuf,

    /// Processing variant (defaults to the configured one)
    #[arg(long)]
    pub variant: Option<String>,
}

/// Arguments for the `logs` command
#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Run id
    #[arg(long)]
    pub run_id: u64,

    /// Number of lines (clamped to 10..=5000, default 200)
    #[arg(long)]
    pub lines: Option<usize>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["dropzone", "run", "/in/a.csv", "--variant", "majority"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.file, PathBuf::from("/in/a.csv"));
                assert_eq!(args.variant.as_deref(), Some("majority"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_logs_with_globals() {
        let cli = Cli::try_parse_from([
            "dropzone",
            "logs",
            "--run-id",
            "7",
            "--lines",
            "20",
            "-c",
            "dropzone.toml",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("dropzone.toml")));
        match cli.command {
            Commands::Logs(args) => {
                assert_eq!(args.run_id, 7);
                assert_eq!(args.lines, Some(20));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["dropzone", "-q", "-v", "watch"]).is_err());
    }
}

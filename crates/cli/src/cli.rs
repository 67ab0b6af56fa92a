//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::PeripheralKind;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Wearable Recorder - motion capture from a BLE ring and a wrist host
#[derive(Parser, Debug)]
#[command(
    name = "wearable-recorder",
    author,
    version,
    about = "Wearable motion recorder tools",
    long_about = "Replays captured ring / wrist streams through a full recording session,\n\
                  inspects the resulting .data files, and validates recorder configuration."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WEARABLE_RECORDER_VERBOSE")]
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
        env = "WEARABLE_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this address (disabled when unset)
    #[arg(long, global = true, env = "WEARABLE_RECORDER_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a captured stream through a recording session
    Replay(ReplayArgs),

    /// Summarize a recorded .data file
    Inspect(InspectArgs),

    /// Validate configuration file without recording
    Validate(ValidateArgs),
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Captured stream: raw ring notification bytes, or JSON lines of wrist axis events
    pub capture: PathBuf,

    /// Which peripheral produced the capture
    #[arg(short, long, value_enum)]
    pub peripheral: PeripheralArg,

    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "recorder.toml",
        env = "WEARABLE_RECORDER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the output directory from configuration
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the participant id from configuration
    #[arg(long)]
    pub participant: Option<String>,

    /// Ring captures: bytes per simulated notification
    #[arg(long, default_value = "20")]
    pub chunk_size: usize,

    /// Ring captures: host milliseconds between notifications
    #[arg(long, default_value = "10")]
    pub chunk_interval_ms: i64,

    /// Give up after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "WEARABLE_RECORDER_TIMEOUT")]
    pub timeout: u64,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Recorded .data file
    pub path: PathBuf,

    /// Also print the first N records
    #[arg(long, default_value = "0")]
    pub records: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "recorder.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Peripheral selector
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeripheralArg {
    Ring,
    Wrist,
}

impl From<PeripheralArg> for PeripheralKind {
    fn from(arg: PeripheralArg) -> Self {
        match arg {
            PeripheralArg::Ring => PeripheralKind::Ring,
            PeripheralArg::Wrist => PeripheralKind::Wrist,
        }
    }
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_args() {
        let cli = Cli::try_parse_from([
            "wearable-recorder",
            "-v",
            "replay",
            "capture.bin",
            "--peripheral",
            "ring",
            "--chunk-size",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(PeripheralKind::from(args.peripheral), PeripheralKind::Ring);
                assert_eq!(args.chunk_size, 7);
                assert_eq!(args.chunk_interval_ms, 10);
                assert_eq!(args.config, PathBuf::from("recorder.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["wearable-recorder", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}

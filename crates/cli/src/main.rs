//! # Wearable Recorder CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 采集数据回放 (完整录制会话)
//! - 数据文件检查
//! - 配置验证

mod cli;
mod commands;
mod error;
mod replay;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_inspect, run_replay, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Wearable Recorder CLI starting"
    );

    let result = match &cli.command {
        Commands::Replay(args) => run_replay(args).await,
        Commands::Inspect(args) => run_inspect(args),
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging (and the optional metrics endpoint) from CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let mut config = ObservabilityConfig::logging_only(cli.log_format.into(), default_level)
        .with_metrics_addr(cli.metrics_addr);
    if cli.quiet {
        config = config.with_forced_level("warn");
    }

    observability::init_with_config(config)
}

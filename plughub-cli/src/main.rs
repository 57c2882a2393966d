//! PlugHub - plugin manager for a CAD host
//!
//! Lists the plugins published in the hub catalog together with the ones
//! installed on this machine, checks them for updates and uninstalls them.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use plughub_core::config::HubConfig;

mod hub_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "plughub",
    about = "Browse, check and uninstall plugins of the host application",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: hub_cli::HubCommand,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    json_logs: bool,

    /// Override configuration file path
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

/// Initialize tracing with CLI flags
///
/// `RUST_LOG` takes precedence over --log-level when set.
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    // Logs go to stderr so --json output on stdout stays parseable
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<PathBuf>) -> Result<HubConfig> {
    let config = match path {
        Some(path) => HubConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => HubConfig::load().context("Failed to load config")?,
    };

    tracing::debug!(
        "Hub {}/{}@{}",
        config.hub.owner,
        config.hub.repo,
        config.hub.branch
    );
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.json_logs);

    let config = load_config(cli.config)?;
    cli.command.execute(config)
}

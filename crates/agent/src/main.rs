//! Spool - Transactional event agent
//!
//! # Usage
//!
//! ```bash
//! # Run the agent (default), reading events from stdin
//! spool --config spool.toml
//!
//! # Validate a config and print what it would build
//! spool check --config spool.toml
//! ```

mod agent;
mod cmd;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use spool_config::{Config, DEFAULT_LOG_FILTER, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Spool - Transactional event agent
#[derive(Parser, Debug)]
#[command(name = "spool")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log filter: a level or tracing directive list. Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent
    Run(cmd::run::RunArgs),

    /// Validate configuration and print the components it defines
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Check) => {
            // Check only prints to stdout
            cmd::check::run(cli.config.as_deref())
        }
        Some(Command::Run(args)) => {
            init_logging(cli.log_level.as_deref(), &resolve_log_config(cli.config.as_deref()))?;
            cmd::run::run(cli.config, args).await
        }
        // No subcommand = run with defaults
        None => {
            init_logging(cli.log_level.as_deref(), &resolve_log_config(cli.config.as_deref()))?;
            cmd::run::run(cli.config, cmd::run::RunArgs::default()).await
        }
    }
}

/// Logging section of the config file, or defaults when it cannot be read
///
/// Config errors are reported properly once logging is up.
fn resolve_log_config(config_path: Option<&Path>) -> LogConfig {
    config_path
        .filter(|path| path.exists())
        .and_then(|path| Config::from_file(path).ok())
        .map(|config| config.log)
        .unwrap_or_default()
}

/// Initialize the tracing subscriber for logging
///
/// Filter precedence: CLI flag > config file > "info".
fn init_logging(cli_level: Option<&str>, log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(log.filter(cli_level))
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    let writer = match log.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = match log.format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    Ok(())
}

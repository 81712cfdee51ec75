//! Container monitor CLI
//!
//! Starts and stops the monitor sidecar for the configured target container
//! and manages the persisted configuration.

mod config;
mod output;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use monitor_lib::{DockerClient, MonitorLifecycle, RuntimeError, StartOutcome, StopOutcome};
use std::path::PathBuf;

/// Container Monitor CLI
#[derive(Parser)]
#[command(name = "monitor")]
#[command(author, version, about = "Manage the container monitor sidecar", long_about = None)]
struct Cli {
    /// Path of the container runtime socket
    #[arg(
        long,
        env = "MONITOR_DOCKER_SOCKET",
        default_value = "/var/run/docker.sock"
    )]
    socket: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring sidecar for the configured target container
    Start,

    /// Stop and remove the monitoring sidecar
    Stop,

    /// Manage persisted configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all config parameters
    List,

    /// Print a single config parameter
    Get {
        /// Config key, e.g. target-container-name
        key: String,
    },

    /// Set a config parameter and persist it
    Set {
        /// Config key, e.g. target-container-name
        key: String,
        /// New value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Commands::Start => {
            let lifecycle = lifecycle_for(&cli.socket, &config);
            match lifecycle.ensure_running().await {
                Ok(StartOutcome::AlreadyRunning) => {
                    output::print_warning("Monitor process already running.");
                }
                Ok(StartOutcome::Started) => {
                    output::print_success("Successfully started monitor service");
                }
                Err(err) => fail(err),
            }
        }
        Commands::Stop => {
            let lifecycle = lifecycle_for(&cli.socket, &config);
            match lifecycle.ensure_stopped().await {
                Ok(StopOutcome::NotRunning) => {
                    output::print_warning("Monitor process not running.");
                }
                Ok(StopOutcome::Stopped) => {
                    output::print_success("Successfully stopped monitor service");
                }
                Ok(StopOutcome::RemovedStale) => {
                    output::print_success("Removed leftover stopped monitor container");
                }
                Err(err) => fail(err),
            }
        }
        Commands::Config(command) => run_config_command(command, config)?,
    }

    Ok(())
}

fn lifecycle_for(socket: &PathBuf, config: &config::Config) -> MonitorLifecycle {
    MonitorLifecycle::new(DockerClient::new(socket), config.target_container())
}

fn run_config_command(command: ConfigCommands, mut config: config::Config) -> Result<()> {
    match command {
        ConfigCommands::List => {
            for (key, value) in config.entries() {
                println!("{key} = {value}");
            }
        }
        ConfigCommands::Get { key } => {
            let value = config
                .get(&key)
                .ok_or_else(|| anyhow!("unknown config key `{key}`"))?;
            println!("{value}");
        }
        ConfigCommands::Set { key, value } => {
            config.set(&key, value)?;
            config.save()?;
            output::print_success(&format!("Updated {key}"));
        }
    }
    Ok(())
}

fn fail(err: RuntimeError) -> ! {
    output::print_error(&err.to_string());
    std::process::exit(1);
}

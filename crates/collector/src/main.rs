//! Monitor collector - streams one container's resource usage to a log file
//!
//! This binary runs inside the monitor sidecar container. It opens the
//! target container's live stats stream, writes one pipe-delimited usage
//! row per frame, and keeps retrying through target restarts and runtime
//! hiccups until it receives SIGINT or SIGTERM.

use anyhow::Result;
use clap::Parser;
use monitor_lib::{Collector, CollectorConfig, DockerClient};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod settings;

/// Streams a container's resource usage to a log file
#[derive(Parser)]
#[command(name = "monitor-collector", version, about)]
struct Args {
    /// Name or ID of the container to monitor
    #[arg(long, env = "MONITOR_CONTAINER", default_value = "nginx-alpine")]
    container: String,

    /// Output log file path (defaults to <log dir>/<container>_<timestamp>.csv)
    #[arg(long)]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let args = Args::parse();
    let settings = settings::Settings::load()?;

    let out_path = args.log.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H:%M:%S");
        settings
            .log_dir
            .join(format!("{}_{stamp}.csv", args.container))
    });
    info!(
        container = %args.container,
        path = %out_path.display(),
        "starting monitor collector"
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(shutdown_on_signal(shutdown_tx));

    let client = DockerClient::new(&settings.docker_socket);
    let config = CollectorConfig {
        backoff: Duration::from_secs(settings.backoff_secs),
        ..Default::default()
    };
    let collector = Collector::new(client, args.container).with_config(config);
    collector.run(&out_path, shutdown_rx).await?;

    info!("exiting");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then request collector shutdown.
async fn shutdown_on_signal(shutdown_tx: broadcast::Sender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
        _ = term.recv() => info!("SIGTERM received"),
    }
    let _ = shutdown_tx.send(());
}

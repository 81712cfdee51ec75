//! Collector settings

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment-driven settings for the collector process
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path of the container runtime socket
    #[serde(default = "default_docker_socket")]
    pub docker_socket: PathBuf,

    /// Directory for log files when no explicit path is given
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Backoff between stream reopen attempts, in seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

fn default_docker_socket() -> PathBuf {
    PathBuf::from("/var/run/docker.sock")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/mnt/log")
}

fn default_backoff_secs() -> u64 {
    1
}

impl Settings {
    /// Load settings from `MONITOR_*` environment variables, falling back to
    /// defaults.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(settings.try_deserialize().unwrap_or_else(|_| Settings {
            docker_socket: default_docker_socket(),
            log_dir: default_log_dir(),
            backoff_secs: default_backoff_secs(),
        }))
    }
}

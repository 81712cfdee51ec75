//! Monitor sidecar lifecycle
//!
//! Drives the monitor container through its three observable states using
//! the runtime as the single source of truth. No state is cached locally:
//! every operation re-queries the runtime, so local belief can never drift
//! from runtime truth. `ensure_running` and `ensure_stopped` are idempotent.

use crate::docker::{ContainerSpec, DockerClient, HostConfig, RuntimeError};
use std::path::PathBuf;

/// Name prefix for the monitor container, followed by the target name.
pub const MONITOR_NAME_PREFIX: &str = "monitor-";

/// Image the monitor sidecar runs.
pub const DEFAULT_MONITOR_IMAGE: &str = "monitor-srv:latest";

/// Default host directory bind-mounted into the sidecar for log output.
pub const DEFAULT_HOST_LOG_DIR: &str = "/var/log/container-monitor";

/// Mount point of the log directory inside the sidecar.
pub const SIDECAR_LOG_MOUNT: &str = "/mnt/log";

/// Observed existence/run status of the monitor container, recomputed on
/// demand from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Absent,
    Running,
    Stopped,
}

/// Result of [`MonitorLifecycle::ensure_running`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A monitor container was already running; nothing was done.
    AlreadyRunning,
    /// A monitor container was created and started.
    Started,
}

/// Result of [`MonitorLifecycle::ensure_stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No monitor container existed; nothing was done.
    NotRunning,
    /// A running monitor container was stopped and removed.
    Stopped,
    /// A stopped monitor container was left over and has been removed.
    RemovedStale,
}

/// Manages the monitor sidecar for one target container.
#[derive(Debug, Clone)]
pub struct MonitorLifecycle {
    client: DockerClient,
    monitor_name: String,
    image: String,
    host_log_dir: PathBuf,
}

impl MonitorLifecycle {
    /// Bind a lifecycle manager to `target`.
    pub fn new(client: DockerClient, target: impl AsRef<str>) -> Self {
        Self {
            client,
            monitor_name: format!("{MONITOR_NAME_PREFIX}{}", target.as_ref()),
            image: DEFAULT_MONITOR_IMAGE.to_owned(),
            host_log_dir: PathBuf::from(DEFAULT_HOST_LOG_DIR),
        }
    }

    /// Override the sidecar image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Override the host directory bind-mounted for log output.
    pub fn with_host_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.host_log_dir = dir.into();
        self
    }

    /// Name of the monitor container for this target.
    pub fn monitor_name(&self) -> &str {
        &self.monitor_name
    }

    /// Query the runtime for the monitor container's current state.
    pub async fn state(&self) -> Result<LifecycleState, RuntimeError> {
        if !self
            .client
            .list_containers(&self.monitor_name, false)
            .await?
            .is_empty()
        {
            return Ok(LifecycleState::Running);
        }
        if !self
            .client
            .list_containers(&self.monitor_name, true)
            .await?
            .is_empty()
        {
            return Ok(LifecycleState::Stopped);
        }
        Ok(LifecycleState::Absent)
    }

    /// Ensure exactly one monitor container is running for the target.
    ///
    /// A leftover stopped instance is removed first, since the runtime
    /// refuses to create a container under a name already in use. A failed
    /// create leaves the state `Absent`; a failed start leaves the created
    /// instance in place, matching the runtime's own semantics.
    pub async fn ensure_running(&self) -> Result<StartOutcome, RuntimeError> {
        match self.state().await? {
            LifecycleState::Running => Ok(StartOutcome::AlreadyRunning),
            LifecycleState::Stopped => {
                self.client.remove_container(&self.monitor_name).await?;
                self.create_and_start().await?;
                Ok(StartOutcome::Started)
            }
            LifecycleState::Absent => {
                self.create_and_start().await?;
                Ok(StartOutcome::Started)
            }
        }
    }

    /// Ensure no monitor container exists for the target.
    pub async fn ensure_stopped(&self) -> Result<StopOutcome, RuntimeError> {
        match self.state().await? {
            LifecycleState::Running => {
                self.client.stop_container(&self.monitor_name).await?;
                self.client.remove_container(&self.monitor_name).await?;
                Ok(StopOutcome::Stopped)
            }
            LifecycleState::Stopped => {
                self.client.remove_container(&self.monitor_name).await?;
                Ok(StopOutcome::RemovedStale)
            }
            LifecycleState::Absent => Ok(StopOutcome::NotRunning),
        }
    }

    async fn create_and_start(&self) -> Result<(), RuntimeError> {
        let socket = self.client.socket_path().display().to_string();
        let spec = ContainerSpec {
            image: self.image.clone(),
            host_config: HostConfig {
                binds: vec![
                    // The sidecar talks to the same runtime it runs under.
                    format!("{socket}:{socket}"),
                    format!("{}:{SIDECAR_LOG_MOUNT}", self.host_log_dir.display()),
                ],
            },
        };
        self.client
            .create_container(&self.monitor_name, &spec)
            .await?;
        self.client.start_container(&self.monitor_name).await
    }
}

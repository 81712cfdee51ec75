//! Resilient collector loop
//!
//! A single logical task that owns the open stats stream and the usage log
//! for its lifetime. The target container's lifecycle is independent of the
//! collector's: the target may be stopped and restarted at will, so "target
//! currently unavailable" is handled exactly like a transient network blip.
//! Every failure short of a sink write error is absorbed into a
//! backoff-and-retry path; only explicit cancellation ends the loop.

use crate::docker::DockerClient;
use crate::sink::UsageLog;
use crate::stats;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Tuning knobs for the collector loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Fixed delay between a failed/ended stream and the next reopen
    /// attempt. Rate-limits reopens against an unreachable runtime.
    pub backoff: Duration,
    /// After this many consecutive failed open attempts the loop logs at
    /// error level instead of warn. It keeps retrying regardless.
    pub escalate_after: u32,
}

impl CollectorConfig {
    /// Whether `failed_opens` consecutive failures warrant error-level
    /// logging.
    fn escalated(&self, failed_opens: u32) -> bool {
        failed_opens >= self.escalate_after
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            escalate_after: 30,
        }
    }
}

/// Streams one container's stats to a usage log until cancelled.
#[derive(Debug)]
pub struct Collector {
    client: DockerClient,
    target: String,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(client: DockerClient, target: impl Into<String>) -> Self {
        Self {
            client,
            target: target.into(),
            config: CollectorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the loop, writing records to `out_path`, until a message arrives
    /// on `shutdown` (or its sender is dropped).
    ///
    /// Cancellation is observed between frames, during the open attempt and
    /// during the backoff sleep. The log is flushed per record and closed
    /// exactly once on exit. Only opening the log and writing to it can
    /// fail; everything runtime-side is retried forever.
    pub async fn run(
        &self,
        out_path: &Path,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let mut sink = UsageLog::create(out_path)?;
        info!(
            container = %self.target,
            path = %out_path.display(),
            "starting collector loop"
        );

        let mut failed_opens: u32 = 0;
        'collect: loop {
            let opened = tokio::select! {
                _ = shutdown.recv() => break 'collect,
                opened = self.client.stats_stream(&self.target) => opened,
            };

            match opened {
                Ok(mut stream) => {
                    info!(container = %self.target, "stats stream open");
                    loop {
                        let next = tokio::select! {
                            _ = shutdown.recv() => break 'collect,
                            next = stream.next_frame() => next,
                        };
                        match next {
                            Ok(Some(raw)) => match stats::decode_frame(&raw) {
                                Ok(record) => {
                                    failed_opens = 0;
                                    if let Err(err) = sink.append(&record) {
                                        let _ = sink.close();
                                        return Err(err);
                                    }
                                }
                                Err(err) => {
                                    warn!(error = %err, "dropping undecodable stats frame");
                                }
                            },
                            Ok(None) => {
                                info!(container = %self.target, "stats stream ended");
                                break;
                            }
                            Err(err) => {
                                warn!(error = %err, "stats stream failed");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    failed_opens = failed_opens.saturating_add(1);
                    if self.config.escalated(failed_opens) {
                        error!(
                            error = %err,
                            attempts = failed_opens,
                            "stats stream has not opened for an extended period; still retrying"
                        );
                    } else {
                        warn!(error = %err, "failed to open stats stream; will retry");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.recv() => break 'collect,
                _ = tokio::time::sleep(self.config.backoff) => {}
            }
        }

        sink.close()?;
        info!(container = %self.target, "collector loop stopped");
        Ok(())
    }
}

//! Stats frame decoding
//!
//! Converts one raw frame from the runtime's stats stream into a
//! [`UsageRecord`]. Decoding is pure: a frame either yields a record or a
//! [`DecodeError`], and the caller decides what to do with a bad frame.

use crate::models::UsageRecord;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// A single frame could not be interpreted.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed stats frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("stats frame is missing counter `{0}`")]
    MissingCounter(&'static str),
}

/// One raw frame from the stats stream.
///
/// Each frame is self-contained: it carries both the current cumulative CPU
/// counters (`cpu_stats`) and the previous sample's (`precpu_stats`), so no
/// state needs to be held between frames.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsFrame {
    pub read: DateTime<Utc>,
    #[serde(default)]
    pub cpu_stats: CpuStats,
    #[serde(default)]
    pub precpu_stats: CpuStats,
    #[serde(default)]
    pub memory_stats: MemoryStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    #[serde(default)]
    pub system_cpu_usage: Option<u64>,
    #[serde(default)]
    pub online_cpus: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CpuUsage {
    #[serde(default)]
    pub total_usage: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: Option<u64>,
    #[serde(default)]
    pub stats: MemoryDetail,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MemoryDetail {
    #[serde(default)]
    pub cache: u64,
}

/// Parse and derive a usage record from one raw frame payload.
pub fn decode_frame(raw: &[u8]) -> Result<UsageRecord, DecodeError> {
    let frame: StatsFrame = serde_json::from_slice(raw)?;
    derive_usage(&frame)
}

/// Derive the normalized usage metrics from a parsed frame.
///
/// CPU percent is `(cpu_delta / system_delta) * online_cpus * 100`, both
/// deltas taken current minus previous within the frame. The first frame of
/// a stream carries no previous system counter; CPU computation is skipped
/// for it and reported as 0. A zero system delta likewise yields 0 rather
/// than an error.
pub fn derive_usage(frame: &StatsFrame) -> Result<UsageRecord, DecodeError> {
    let usage = frame
        .memory_stats
        .usage
        .ok_or(DecodeError::MissingCounter("memory_stats.usage"))?;
    let used_memory = usage.saturating_sub(frame.memory_stats.stats.cache);

    let online_cpus = frame
        .cpu_stats
        .online_cpus
        .ok_or(DecodeError::MissingCounter("cpu_stats.online_cpus"))?;
    let system_now = frame
        .cpu_stats
        .system_cpu_usage
        .ok_or(DecodeError::MissingCounter("cpu_stats.system_cpu_usage"))?;
    let cpu_now = frame
        .cpu_stats
        .cpu_usage
        .total_usage
        .ok_or(DecodeError::MissingCounter("cpu_stats.cpu_usage.total_usage"))?;

    let percent_cpu_usage = match frame.precpu_stats.system_cpu_usage {
        // First sample of a stream: no previous counters to delta against.
        None => 0.0,
        Some(system_prev) => {
            let cpu_prev = frame.precpu_stats.cpu_usage.total_usage.unwrap_or(0);
            let cpu_delta = cpu_now.saturating_sub(cpu_prev);
            let system_delta = system_now.saturating_sub(system_prev);
            if system_delta == 0 {
                0.0
            } else {
                (cpu_delta as f64 / system_delta as f64) * f64::from(online_cpus) * 100.0
            }
        }
    };

    Ok(UsageRecord {
        timestamp: frame.read,
        percent_cpu_usage,
        used_memory,
    })
}

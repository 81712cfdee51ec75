//! Core data models for the container monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized usage sample derived from a raw stats frame.
///
/// `used_memory` excludes page cache, which is reclaimable and not
/// representative of application memory pressure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub percent_cpu_usage: f64,
    pub used_memory: u64,
}

//! Core library for the container monitor
//!
//! This crate provides the building blocks for observing a single container's
//! resource usage:
//! - A thin client for the container runtime's unix-socket HTTP API
//! - The monitor sidecar lifecycle state machine
//! - Decoding of live stats frames into normalized usage records
//! - The resilient collector loop and its append-only log sink

pub mod collector;
pub mod docker;
pub mod lifecycle;
pub mod models;
pub mod sink;
pub mod stats;

pub use collector::{Collector, CollectorConfig};
pub use docker::{ContainerSpec, DockerClient, RuntimeError, StatsStream};
pub use lifecycle::{LifecycleState, MonitorLifecycle, StartOutcome, StopOutcome};
pub use models::UsageRecord;
pub use sink::UsageLog;
pub use stats::{decode_frame, DecodeError, StatsFrame};

//! Common utilities and types shared across miniscm

pub mod config;
pub mod error;
pub mod metrics;
pub mod utils;

pub use config::{Config, ReplicationConfig};
pub use error::{Error, Result};
pub use metrics::{Counter, Gauge, ReplicationMetrics, METRICS};
pub use utils::{format_bytes, timestamp_now, timestamp_now_millis};

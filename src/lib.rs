//! # miniscm
//!
//! Replication management core of a storage container manager (SCM) with:
//! - Immutable data containers replicated across datanodes
//! - Health-driven reconciliation of under-replicated containers
//! - Pluggable, topology-aware replica placement
//! - Bounded, throttled command dispatch to datanodes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Storage Container Manager         │
//! │  - Node registry (heartbeat statuses)   │
//! │  - Health scanner classifies containers │
//! │  - Handlers repair unhealthy ones       │
//! └───────────┬─────────────────────────────┘
//!             │ datanode commands
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼─────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Datanode 1 │   │ Datanode 2 │   │ Datanode 3   │
//! │ (replicas) │   │ (replicas) │   │ (replicas)   │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! The health scanner and the datanode transport are collaborators of this
//! crate, not part of it: classification results come in as
//! [`replication::ContainerHealthResult`] values and commands go out through
//! a bounded queue drained by the transport.

pub mod cluster;
pub mod common;
pub mod replication;

// Re-export commonly used types
pub use common::{Config, Error, ReplicationConfig, Result};
pub use replication::{ReplicationManager, UnderReplicationHandler};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");

//! Container metadata and replica snapshots
//!
//! Containers are immutable once closed; each is replicated onto several
//! datanodes. The structs here are read-only snapshots handed to the
//! replication handlers, which never mutate them.

use crate::cluster::node::DatanodeDetails;
use serde::{Deserialize, Serialize};

/// Container identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ContainerId(pub u64);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Container lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeCycleState {
    Open,
    Closing,
    QuasiClosed,
    Closed,
    Deleting,
}

/// Replica state as last reported by the hosting datanode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaState {
    Open,
    Closing,
    QuasiClosed,
    Closed,
    Unhealthy,
}

/// Point-in-time description of a container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub state: LifeCycleState,
    pub replication_factor: u32,
    /// Highest committed write epoch
    pub sequence_id: u64,
    pub used_bytes: u64,
}

impl ContainerInfo {
    pub fn new(
        id: ContainerId,
        state: LifeCycleState,
        replication_factor: u32,
        sequence_id: u64,
    ) -> Self {
        Self {
            id,
            state,
            replication_factor,
            sequence_id,
            used_bytes: 0,
        }
    }
}

/// A single replica of a container on a specific datanode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerReplica {
    pub container_id: ContainerId,
    pub datanode: DatanodeDetails,
    pub state: ReplicaState,
    /// Write epoch at close time; unhealthy replicas carry none
    pub sequence_id: Option<u64>,
    pub replica_index: u32,
}

impl ContainerReplica {
    pub fn new(
        container_id: ContainerId,
        datanode: DatanodeDetails,
        state: ReplicaState,
        sequence_id: Option<u64>,
    ) -> Self {
        Self {
            container_id,
            datanode,
            state,
            sequence_id,
            replica_index: 0,
        }
    }

    /// A replica counts towards replication only if its contents can serve
    /// reads of the final container data.
    pub fn is_healthy_state(&self, container: &ContainerInfo) -> bool {
        match self.state {
            ReplicaState::Closed => true,
            ReplicaState::QuasiClosed => !self.is_stale(container),
            _ => false,
        }
    }

    /// Quasi-closed replica of a closed container at the wrong write epoch:
    /// it missed the final close and may hold superseded data.
    pub fn is_stale(&self, container: &ContainerInfo) -> bool {
        self.state == ReplicaState::QuasiClosed
            && container.state == LifeCycleState::Closed
            && self.sequence_id != Some(container.sequence_id)
    }
}

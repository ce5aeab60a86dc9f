//! Pending replication operations
//!
//! A pending op records a command already issued to a datanode whose
//! acknowledgement has not arrived yet. Reconciliation reads them as an
//! immutable sequence; expiry and pruning belong to the layer that owns the
//! op store.

use crate::cluster::node::{DatanodeDetails, DatanodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What the in-flight command will do once acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingOpKind {
    Add,
    Delete,
}

/// An in-flight replica operation against one datanode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerReplicaOp {
    pub kind: PendingOpKind,
    pub target: DatanodeDetails,
    pub replica_index: u32,
    /// Epoch milliseconds after which the op is considered lost
    pub deadline_ms: u64,
}

impl ContainerReplicaOp {
    pub fn add(target: DatanodeDetails, replica_index: u32, deadline_ms: u64) -> Self {
        Self {
            kind: PendingOpKind::Add,
            target,
            replica_index,
            deadline_ms,
        }
    }

    pub fn delete(target: DatanodeDetails, replica_index: u32, deadline_ms: u64) -> Self {
        Self {
            kind: PendingOpKind::Delete,
            target,
            replica_index,
            deadline_ms,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.deadline_ms
    }
}

/// Datanodes with a replica deletion in flight
pub fn pending_delete_nodes(ops: &[ContainerReplicaOp]) -> HashSet<DatanodeId> {
    ops.iter()
        .filter(|op| op.kind == PendingOpKind::Delete)
        .map(|op| op.target.id)
        .collect()
}

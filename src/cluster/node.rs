//! Datanode identity, operational state and health
//!
//! A datanode has two independent state dimensions: the operator-driven
//! operational state (in service, decommissioning, maintenance) and the
//! heartbeat-driven health (healthy, stale, dead). Replication decisions need
//! both: a decommissioning node can still be perfectly healthy.

use crate::common::timestamp_now_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Datanode identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DatanodeId(pub Uuid);

impl DatanodeId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DatanodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator-driven lifecycle state of a datanode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOperationalState {
    InService,
    Decommissioning,
    Decommissioned,
    EnteringMaintenance,
    InMaintenance,
}

impl NodeOperationalState {
    /// Node is on its way out of the cluster
    pub fn is_decommission(&self) -> bool {
        matches!(
            self,
            NodeOperationalState::Decommissioning | NodeOperationalState::Decommissioned
        )
    }

    /// Node is being drained for maintenance and will come back
    pub fn is_maintenance(&self) -> bool {
        matches!(
            self,
            NodeOperationalState::EnteringMaintenance | NodeOperationalState::InMaintenance
        )
    }
}

/// Liveness as seen by the heartbeat monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeHealth {
    Healthy,
    Stale,
    Dead,
}

impl NodeHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, NodeHealth::Healthy)
    }
}

/// Combined operational state and health of a datanode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub operational_state: NodeOperationalState,
    pub health: NodeHealth,
}

impl NodeStatus {
    pub fn new(operational_state: NodeOperationalState, health: NodeHealth) -> Self {
        Self {
            operational_state,
            health,
        }
    }

    /// Can this node execute commands and serve replica reads right now?
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }
}

/// Identity and persisted operational state of a datanode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatanodeDetails {
    pub id: DatanodeId,
    pub operational_state: NodeOperationalState,
}

impl DatanodeDetails {
    /// Fresh in-service datanode with a random id
    pub fn random() -> Self {
        Self::with_state(NodeOperationalState::InService)
    }

    pub fn with_state(operational_state: NodeOperationalState) -> Self {
        Self {
            id: DatanodeId::random(),
            operational_state,
        }
    }
}

// Datanode identity is the id alone; the persisted operational state is
// mutable metadata and must not affect set membership.
impl PartialEq for DatanodeDetails {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DatanodeDetails {}

impl std::hash::Hash for DatanodeDetails {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for DatanodeDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Everything the SCM tracks about a registered datanode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatanodeInfo {
    pub details: DatanodeDetails,
    pub status: NodeStatus,
    pub free_bytes: u64,
    pub last_heartbeat_ms: u64,
}

impl DatanodeInfo {
    pub fn new(details: DatanodeDetails, health: NodeHealth, free_bytes: u64) -> Self {
        let status = NodeStatus::new(details.operational_state, health);
        Self {
            details,
            status,
            free_bytes,
            last_heartbeat_ms: timestamp_now_millis(),
        }
    }
}

/// Registry of datanode statuses, maintained from heartbeats
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<DatanodeId, DatanodeInfo>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a datanode
    pub fn register(&self, info: DatanodeInfo) {
        let mut nodes = self.nodes.write().unwrap();
        nodes.insert(info.details.id, info);
    }

    /// Status of a datanode, or `NodeNotFound` if it never registered
    pub fn status(&self, id: &DatanodeId) -> crate::Result<NodeStatus> {
        let nodes = self.nodes.read().unwrap();
        nodes
            .get(id)
            .map(|info| info.status)
            .ok_or_else(|| crate::Error::NodeNotFound(id.to_string()))
    }

    pub fn get(&self, id: &DatanodeId) -> Option<DatanodeInfo> {
        let nodes = self.nodes.read().unwrap();
        nodes.get(id).cloned()
    }

    /// Snapshot of all registered datanodes
    pub fn list(&self) -> Vec<DatanodeInfo> {
        let nodes = self.nodes.read().unwrap();
        nodes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datanode_identity_ignores_op_state() {
        let a = DatanodeDetails::random();
        let mut b = a.clone();
        b.operational_state = NodeOperationalState::Decommissioning;
        assert_eq!(a, b);
    }

    #[test]
    fn test_registry_status() {
        let registry = NodeRegistry::new();
        let dn = DatanodeDetails::random();
        registry.register(DatanodeInfo::new(dn.clone(), NodeHealth::Healthy, 1024));

        let status = registry.status(&dn.id).unwrap();
        assert!(status.is_healthy());
        assert_eq!(status.operational_state, NodeOperationalState::InService);

        let missing = DatanodeId::random();
        assert!(registry.status(&missing).is_err());
    }

    #[test]
    fn test_operational_state_predicates() {
        assert!(NodeOperationalState::Decommissioning.is_decommission());
        assert!(NodeOperationalState::InMaintenance.is_maintenance());
        assert!(!NodeOperationalState::InService.is_decommission());
        assert!(!NodeOperationalState::InService.is_maintenance());
    }
}

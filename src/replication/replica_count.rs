//! Replica accounting for a single container
//!
//! Builds availability counts from a replica snapshot and the in-flight
//! operations, under two modes: counting unhealthy replicas as usable or
//! not. The under-replication handler constructs both views up front and
//! lets its verification step pick which one to act on.

use crate::cluster::container::{ContainerInfo, ContainerReplica, ReplicaState};
use crate::cluster::node::NodeOperationalState;
use crate::replication::op::{ContainerReplicaOp, PendingOpKind};
use std::collections::HashSet;

/// Availability accounting for one container's replica set.
///
/// All counts are fixed at construction; the struct is a cheap value type.
#[derive(Debug, Clone)]
pub struct ContainerReplicaCount {
    container: ContainerInfo,
    replicas: Vec<ContainerReplica>,
    min_healthy_for_maintenance: u32,
    /// Usable replicas on nodes staying in service
    available_in_service: u32,
    /// Usable replicas on their way out of the cluster
    decommission_count: u32,
    /// Usable replicas on nodes draining for maintenance
    maintenance_count: u32,
    /// Healthy-state replicas on nodes that can currently serve reads
    healthy_count: u32,
    /// In-flight adds, counting each physical datanode at most once
    pending_adds: u32,
}

impl ContainerReplicaCount {
    /// Build the counts. With `consider_unhealthy`, replicas in unusable
    /// states (unhealthy, or quasi-closed at a superseded epoch) count
    /// towards availability; `healthy_replica_count` never includes them.
    pub fn new(
        container: ContainerInfo,
        replicas: &[ContainerReplica],
        pending_ops: &[ContainerReplicaOp],
        min_healthy_for_maintenance: u32,
        consider_unhealthy: bool,
    ) -> Self {
        let mut available_in_service = 0;
        let mut decommission_count = 0;
        let mut maintenance_count = 0;
        let mut healthy_count = 0;

        for replica in replicas {
            let healthy_state = replica.is_healthy_state(&container);
            let op_state = replica.datanode.operational_state;

            if healthy_state
                && matches!(
                    op_state,
                    NodeOperationalState::InService | NodeOperationalState::Decommissioning
                )
            {
                healthy_count += 1;
            }

            // Only closed-ish and unhealthy replicas can ever count towards
            // availability; open or still-closing ones hold no final data.
            let countable = match replica.state {
                ReplicaState::Closed | ReplicaState::QuasiClosed => true,
                ReplicaState::Unhealthy => consider_unhealthy,
                _ => false,
            };
            if !countable || (!healthy_state && !consider_unhealthy) {
                continue;
            }
            match op_state {
                NodeOperationalState::InService => available_in_service += 1,
                NodeOperationalState::Decommissioning | NodeOperationalState::Decommissioned => {
                    decommission_count += 1
                }
                NodeOperationalState::EnteringMaintenance | NodeOperationalState::InMaintenance => {
                    maintenance_count += 1
                }
            }
        }

        // A pending add onto a node that already holds a replica must not be
        // double counted: the physical datanode can only contribute one copy.
        let replica_nodes: HashSet<_> = replicas.iter().map(|r| r.datanode.id).collect();
        let pending_adds = pending_ops
            .iter()
            .filter(|op| op.kind == PendingOpKind::Add && !replica_nodes.contains(&op.target.id))
            .count() as u32;

        Self {
            container,
            replicas: replicas.to_vec(),
            min_healthy_for_maintenance,
            available_in_service,
            decommission_count,
            maintenance_count,
            healthy_count,
            pending_adds,
        }
    }

    /// Replicas required on nodes outside maintenance. Maintenance nodes come
    /// back, so their replicas lower the requirement, but never below the
    /// configured minimum. Decommissioning nodes never come back and lower
    /// nothing.
    fn required_healthy(&self) -> u32 {
        let factor = self.container.replication_factor;
        if self.maintenance_count == 0 {
            return factor;
        }
        let min_healthy = self.min_healthy_for_maintenance.min(factor);
        factor.saturating_sub(self.maintenance_count).max(min_healthy)
    }

    /// New replicas that must still be created, after discounting the
    /// replication already in flight.
    pub fn additional_replica_needed(&self) -> u32 {
        self.required_healthy()
            .saturating_sub(self.available_in_service)
            .saturating_sub(self.pending_adds)
    }

    /// Is replication satisfied by present replicas, optionally counting the
    /// adds already in flight?
    pub fn is_sufficiently_replicated(&self, include_pending: bool) -> bool {
        let pending = if include_pending { self.pending_adds } else { 0 };
        self.available_in_service + pending >= self.required_healthy()
    }

    /// Healthy-state replicas on nodes that can currently serve reads:
    /// in service, or decommissioning but not yet gone.
    pub fn healthy_replica_count(&self) -> u32 {
        self.healthy_count
    }

    pub fn replicas(&self) -> &[ContainerReplica] {
        &self.replicas
    }

    pub fn container(&self) -> &ContainerInfo {
        &self.container
    }
}

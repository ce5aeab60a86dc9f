//! Node-set selection helpers for replication decisions

use crate::cluster::container::{ContainerInfo, ContainerReplica, ReplicaState};
use crate::cluster::node::{DatanodeDetails, NodeOperationalState};
use crate::replication::dispatch::ReplicationManager;
use crate::replication::op::{ContainerReplicaOp, PendingOpKind};

/// Node sets handed to the placement policy: `used` nodes hold (or will
/// hold) a replica and keep their topology weight; `excluded` nodes must not
/// influence placement at all.
#[derive(Debug, Default)]
pub struct ExcludedAndUsedNodes {
    pub used: Vec<DatanodeDetails>,
    pub excluded: Vec<DatanodeDetails>,
}

/// Partition current replica hosts and pending-op targets for placement.
///
/// Hosts that keep their replica (in service or in maintenance) are `used`.
/// Hosts on the way out, hosts of unhealthy replicas and hosts that fail the
/// health check are `excluded`; so is any node with a deletion in flight.
/// Pending-add targets are `used`: the copy is already on its way there.
pub fn excluded_and_used_nodes(
    replicas: &[ContainerReplica],
    pending_ops: &[ContainerReplicaOp],
    rm: &dyn ReplicationManager,
) -> ExcludedAndUsedNodes {
    let mut nodes = ExcludedAndUsedNodes::default();

    for replica in replicas {
        let datanode = replica.datanode.clone();
        if replica.state == ReplicaState::Unhealthy {
            nodes.excluded.push(datanode);
            continue;
        }
        let healthy = match rm.node_status(&replica.datanode) {
            Ok(status) => status.is_healthy(),
            Err(_) => false,
        };
        if !healthy {
            nodes.excluded.push(datanode);
            continue;
        }
        if replica.datanode.operational_state.is_decommission() {
            nodes.excluded.push(datanode);
        } else {
            nodes.used.push(datanode);
        }
    }

    for op in pending_ops {
        match op.kind {
            PendingOpKind::Add => nodes.used.push(op.target.clone()),
            PendingOpKind::Delete => nodes.excluded.push(op.target.clone()),
        }
    }

    nodes
}

/// Pick one replica whose removal frees a topology slot without losing data.
///
/// Candidates are unhealthy replicas first, then quasi-closed replicas at a
/// superseded epoch, lowest epoch first. Nothing is picked while a delete is
/// already in flight, when the container holds fewer replicas than its
/// replication factor, or when no candidate's host is healthy and in
/// service.
pub fn select_unhealthy_replica_for_delete(
    container: &ContainerInfo,
    replicas: &[ContainerReplica],
    pending_deletes: usize,
    rm: &dyn ReplicationManager,
) -> Option<ContainerReplica> {
    if pending_deletes > 0 {
        tracing::debug!(
            "Not scheduling another delete for container {} with {} already in flight",
            container.id,
            pending_deletes
        );
        return None;
    }
    if (replicas.len() as u32) < container.replication_factor {
        return None;
    }

    let mut candidates: Vec<&ContainerReplica> = replicas
        .iter()
        .filter(|r| r.state == ReplicaState::Unhealthy || r.is_stale(container))
        .filter(|r| match rm.node_status(&r.datanode) {
            Ok(status) => {
                status.is_healthy()
                    && status.operational_state == NodeOperationalState::InService
            }
            Err(_) => false,
        })
        .collect();

    candidates.sort_by_key(|r| (r.state != ReplicaState::Unhealthy, r.sequence_id.unwrap_or(0)));
    candidates.first().map(|r| (*r).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::testing::*;
    use crate::cluster::node::{NodeHealth, NodeStatus};
    use crate::cluster::LifeCycleState;
    use crate::common::{ReplicationConfig, ReplicationMetrics};
    use crate::replication::command::DatanodeCommand;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use crate::cluster::node::NodeOperationalState::*;

    /// Reports every node healthy (with its persisted operational state)
    /// unless a health override is registered.
    struct StaticNodes {
        config: ReplicationConfig,
        metrics: ReplicationMetrics,
        health_overrides: Mutex<HashMap<crate::cluster::DatanodeId, NodeHealth>>,
    }

    impl StaticNodes {
        fn new() -> Self {
            Self {
                config: ReplicationConfig::default(),
                metrics: ReplicationMetrics::new(),
                health_overrides: Mutex::new(HashMap::new()),
            }
        }

        fn mark(&self, dn: &DatanodeDetails, health: NodeHealth) {
            self.health_overrides.lock().unwrap().insert(dn.id, health);
        }
    }

    impl ReplicationManager for StaticNodes {
        fn node_status(&self, datanode: &DatanodeDetails) -> crate::Result<NodeStatus> {
            let health = self
                .health_overrides
                .lock()
                .unwrap()
                .get(&datanode.id)
                .copied()
                .unwrap_or(NodeHealth::Healthy);
            Ok(NodeStatus::new(datanode.operational_state, health))
        }

        fn send_throttled_replication(
            &self,
            _container: &ContainerInfo,
            _sources: &[DatanodeDetails],
            _target: &DatanodeDetails,
            _priority: u32,
        ) -> crate::Result<()> {
            Ok(())
        }

        fn send_datanode_command(
            &self,
            _command: DatanodeCommand,
            _container: &ContainerInfo,
            _target: &DatanodeDetails,
        ) -> crate::Result<()> {
            Ok(())
        }

        fn send_delete_command(
            &self,
            _container: &ContainerInfo,
            _replica_index: u32,
            _target: &DatanodeDetails,
            _force: bool,
        ) -> crate::Result<()> {
            Ok(())
        }

        fn replication_config(&self) -> &ReplicationConfig {
            &self.config
        }

        fn metrics(&self) -> &ReplicationMetrics {
            &self.metrics
        }
    }

    #[test]
    fn test_used_and_excluded_classification() {
        let rm = StaticNodes::new();
        let c = container(LifeCycleState::Closed);

        let good = replica(&c, InService, ReplicaState::Closed);
        let maintenance = replica(&c, InMaintenance, ReplicaState::Closed);
        let decommissioning = replica(&c, Decommissioning, ReplicaState::Closed);
        let unhealthy = replica(&c, InService, ReplicaState::Unhealthy);
        let dead_host = replica(&c, InService, ReplicaState::Closed);
        rm.mark(&dead_host.datanode, NodeHealth::Dead);

        let pending_add = datanode(InService);
        let pending_delete = datanode(InService);
        let pending = vec![
            ContainerReplicaOp::add(pending_add.clone(), 0, u64::MAX),
            ContainerReplicaOp::delete(pending_delete.clone(), 0, u64::MAX),
        ];

        let replicas = vec![
            good.clone(),
            maintenance.clone(),
            decommissioning.clone(),
            unhealthy.clone(),
            dead_host.clone(),
        ];
        let nodes = excluded_and_used_nodes(&replicas, &pending, &rm);

        assert!(nodes.used.contains(&good.datanode));
        assert!(nodes.used.contains(&maintenance.datanode));
        assert!(nodes.used.contains(&pending_add));
        assert_eq!(nodes.used.len(), 3);

        assert!(nodes.excluded.contains(&decommissioning.datanode));
        assert!(nodes.excluded.contains(&unhealthy.datanode));
        assert!(nodes.excluded.contains(&dead_host.datanode));
        assert!(nodes.excluded.contains(&pending_delete));
        assert_eq!(nodes.excluded.len(), 4);
    }

    #[test]
    fn test_delete_prefers_unhealthy_over_stale_quasi() {
        let rm = StaticNodes::new();
        let c = container_with_seq(LifeCycleState::Closed, 10);

        let mut replicas = crate::cluster::testing::replicas(&c, ReplicaState::Closed, 2);
        let stale = replica_with_seq(&c, InService, ReplicaState::QuasiClosed, 8);
        let unhealthy = replica(&c, InService, ReplicaState::Unhealthy);
        replicas.push(stale);
        replicas.push(unhealthy.clone());

        let picked = select_unhealthy_replica_for_delete(&c, &replicas, 0, &rm).unwrap();
        assert_eq!(picked.datanode, unhealthy.datanode);
    }

    #[test]
    fn test_delete_breaks_ties_by_lowest_epoch() {
        let rm = StaticNodes::new();
        let c = container_with_seq(LifeCycleState::Closed, 10);

        let mut replicas = crate::cluster::testing::replicas(&c, ReplicaState::Closed, 2);
        let newer = replica_with_seq(&c, InService, ReplicaState::QuasiClosed, 8);
        let older = replica_with_seq(&c, InService, ReplicaState::QuasiClosed, 5);
        replicas.push(newer);
        replicas.push(older.clone());

        let picked = select_unhealthy_replica_for_delete(&c, &replicas, 0, &rm).unwrap();
        assert_eq!(picked.datanode, older.datanode);
    }

    #[test]
    fn test_no_delete_while_one_is_in_flight() {
        let rm = StaticNodes::new();
        let c = container(LifeCycleState::Closed);

        let mut replicas = crate::cluster::testing::replicas(&c, ReplicaState::Closed, 2);
        replicas.push(replica(&c, InService, ReplicaState::Unhealthy));

        assert!(select_unhealthy_replica_for_delete(&c, &replicas, 1, &rm).is_none());
    }

    #[test]
    fn test_no_delete_below_replication_factor() {
        let rm = StaticNodes::new();
        let c = container(LifeCycleState::Closed);

        let mut replicas = crate::cluster::testing::replicas(&c, ReplicaState::Closed, 1);
        replicas.push(replica(&c, InService, ReplicaState::Unhealthy));

        assert!(select_unhealthy_replica_for_delete(&c, &replicas, 0, &rm).is_none());
    }

    #[test]
    fn test_no_delete_from_unreachable_host() {
        let rm = StaticNodes::new();
        let c = container(LifeCycleState::Closed);

        let mut replicas = crate::cluster::testing::replicas(&c, ReplicaState::Closed, 2);
        let unhealthy = replica(&c, InService, ReplicaState::Unhealthy);
        rm.mark(&unhealthy.datanode, NodeHealth::Dead);
        replicas.push(unhealthy);

        assert!(select_unhealthy_replica_for_delete(&c, &replicas, 0, &rm).is_none());
    }
}

//! Reconciliation of under-replicated containers
//!
//! Invoked by the replication dispatcher for every container the health
//! scanner reports as under-replicated. The handler re-verifies the report
//! against work already in flight, picks copy sources at the highest write
//! epoch available, asks the placement policy for targets and queues
//! replication commands. It keeps no state between invocations; whenever it
//! cannot make full progress it raises a retryable error so the container is
//! re-queued with a fresh snapshot.

use crate::cluster::container::{ContainerInfo, ContainerReplica, LifeCycleState, ReplicaState};
use crate::cluster::node::DatanodeDetails;
use crate::common::{Error, ReplicationConfig, Result};
use crate::replication::command::{DatanodeCommand, ReplicateContainerCommand};
use crate::replication::dispatch::ReplicationManager;
use crate::replication::health::ContainerHealthResult;
use crate::replication::op::{pending_delete_nodes, ContainerReplicaOp, PendingOpKind};
use crate::replication::placement::PlacementPolicy;
use crate::replication::replica_count::ContainerReplicaCount;
use crate::replication::selection::{
    excluded_and_used_nodes, select_unhealthy_replica_for_delete, ExcludedAndUsedNodes,
};
use std::sync::Arc;

/// Handler restoring replication of under-replicated containers.
pub struct UnderReplicationHandler {
    placement: Arc<dyn PlacementPolicy>,
    replication: Arc<dyn ReplicationManager>,
    container_size: u64,
}

impl UnderReplicationHandler {
    pub fn new(
        placement: Arc<dyn PlacementPolicy>,
        config: &ReplicationConfig,
        replication: Arc<dyn ReplicationManager>,
    ) -> Self {
        Self {
            placement,
            replication,
            container_size: config.container_size,
        }
    }

    /// Decide whether the container in `result` still needs replication and
    /// queue the commands that restore it. Returns the number of commands
    /// queued; raises a retryable error when the container must be re-queued.
    pub fn process_and_send_commands(
        &self,
        replicas: &[ContainerReplica],
        pending_ops: &[ContainerReplicaOp],
        result: &ContainerHealthResult,
        min_healthy_for_maintenance: u32,
    ) -> Result<usize> {
        let container = &result.container;
        tracing::debug!("Handling under replicated container {}", container.id);

        let with_unhealthy = ContainerReplicaCount::new(
            container.clone(),
            replicas,
            pending_ops,
            min_healthy_for_maintenance,
            true,
        );
        let without_unhealthy = ContainerReplicaCount::new(
            container.clone(),
            replicas,
            pending_ops,
            min_healthy_for_maintenance,
            false,
        );

        let Some(replica_count) =
            Self::verify_under_replication(&with_unhealthy, &without_unhealthy)
        else {
            return Ok(0);
        };

        let sources = self.sources(replica_count, pending_ops);
        if sources.is_empty() {
            tracing::warn!(
                "Cannot replicate container {} because no closed, quasi-closed or unhealthy replicas were found",
                container.id
            );
            return Ok(0);
        }

        let targets = match self.targets(replica_count, pending_ops) {
            Ok(targets) => targets,
            Err(err @ Error::NoSuitableDatanodes(_)) => {
                tracing::warn!(
                    "Cannot replicate container {} because no suitable targets were found",
                    container.id
                );
                self.remove_unhealthy_replica_if_possible(container, replicas, pending_ops)?;
                // Re-raise the selection failure so the container is
                // re-queued and tried again once a slot opens up.
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let commands_sent = self.send_replication_commands(container, &sources, &targets)?;

        let needed = replica_count.additional_replica_needed() as usize;
        if targets.len() < needed {
            tracing::debug!(
                "Placement found {} of {} targets needed for container {}",
                targets.len(),
                needed,
                container.id
            );
            self.replication.metrics().partial_replication_total.inc();
            return Err(Error::InsufficientDatanodes {
                needed,
                found: targets.len(),
            });
        }
        Ok(commands_sent)
    }

    /// Decide which accounting view, if any, the repair should run under.
    /// `None` means nothing is left to do here.
    fn verify_under_replication<'a>(
        with_unhealthy: &'a ContainerReplicaCount,
        without_unhealthy: &'a ContainerReplicaCount,
    ) -> Option<&'a ContainerReplicaCount> {
        let container_id = without_unhealthy.container().id;
        if without_unhealthy.is_sufficiently_replicated(false) {
            tracing::info!(
                "Container {} state changed and it is no longer under replicated",
                container_id
            );
            return None;
        }
        if without_unhealthy.is_sufficiently_replicated(true) {
            tracing::info!(
                "Container {} will be sufficiently replicated once pending adds complete",
                container_id
            );
            return None;
        }
        if with_unhealthy.replicas().is_empty() {
            tracing::warn!(
                "Container {} has no replicas at all and is unrecoverable",
                container_id
            );
            return None;
        }
        if with_unhealthy.is_sufficiently_replicated(true)
            && with_unhealthy.healthy_replica_count() == 0
        {
            tracing::info!(
                "Container {} has only unhealthy replicas but enough pending adds to cover them",
                container_id
            );
            return None;
        }

        // With healthy replicas present, restore replication from them and
        // leave unhealthy copies out of the accounting. With none at all,
        // the unhealthy replicas are the last copies left and must be
        // propagated to keep the data around.
        if without_unhealthy.healthy_replica_count() > 0 {
            Some(without_unhealthy)
        } else {
            Some(with_unhealthy)
        }
    }

    /// Datanodes able to serve as copy sources, in replica input order,
    /// restricted to the highest write epoch present among them.
    fn sources(
        &self,
        replica_count: &ContainerReplicaCount,
        pending_ops: &[ContainerReplicaOp],
    ) -> Vec<DatanodeDetails> {
        let pending_deletion = pending_delete_nodes(pending_ops);

        let container = replica_count.container();
        let has_closed = replica_count
            .replicas()
            .iter()
            .any(|r| r.state == ReplicaState::Closed);
        // Quasi-closed replicas may stand in when no closed one exists or
        // when the container itself never fully closed.
        let allow_quasi = !has_closed || container.state == LifeCycleState::QuasiClosed;
        // Unhealthy replicas are last-resort sources: only when no replica
        // can otherwise serve reads.
        let allow_unhealthy = replica_count.healthy_replica_count() == 0;

        let available: Vec<&ContainerReplica> = replica_count
            .replicas()
            .iter()
            .filter(|r| match r.state {
                ReplicaState::Closed => true,
                ReplicaState::QuasiClosed => allow_quasi,
                ReplicaState::Unhealthy => allow_unhealthy,
                _ => false,
            })
            .filter(|r| match self.replication.node_status(&r.datanode) {
                Ok(status) => status.is_healthy(),
                Err(_) => false,
            })
            .filter(|r| !pending_deletion.contains(&r.datanode.id))
            .collect();

        // Replicas below the highest sequence id may be stale copies, and
        // ones without a sequence id are unverifiable once any replica
        // carries one. Replicate only the highest epoch.
        let max_sequence = available.iter().filter_map(|r| r.sequence_id).max();
        available
            .into_iter()
            .filter(|r| match max_sequence {
                Some(max) => r.sequence_id == Some(max),
                None => true,
            })
            .map(|r| r.datanode.clone())
            .collect()
    }

    fn targets(
        &self,
        replica_count: &ContainerReplicaCount,
        pending_ops: &[ContainerReplicaOp],
    ) -> Result<Vec<DatanodeDetails>> {
        let needed = replica_count.additional_replica_needed() as usize;
        tracing::debug!(
            "Need {} target datanodes for container {}",
            needed,
            replica_count.container().id
        );

        let ExcludedAndUsedNodes { used, excluded } = excluded_and_used_nodes(
            replica_count.replicas(),
            pending_ops,
            self.replication.as_ref(),
        );
        tracing::debug!(
            "Choosing targets with {} used and {} excluded nodes",
            used.len(),
            excluded.len()
        );

        self.placement
            .choose_datanodes(&used, &excluded, &[], needed, self.container_size, 0)
    }

    fn send_replication_commands(
        &self,
        container: &ContainerInfo,
        sources: &[DatanodeDetails],
        targets: &[DatanodeDetails],
    ) -> Result<usize> {
        let push = self.replication.replication_config().push;
        let mut commands_sent = 0;

        for target in targets {
            if push {
                self.replication
                    .send_throttled_replication(container, sources, target, 0)?;
            } else {
                let command =
                    ReplicateContainerCommand::from_sources(container.id, sources.to_vec());
                self.replication.send_datanode_command(
                    DatanodeCommand::Replicate(command),
                    container,
                    target,
                )?;
            }
            commands_sent += 1;
        }
        Ok(commands_sent)
    }

    /// Free a topology slot by deleting one expendable replica, if that can
    /// be done without risking data.
    fn remove_unhealthy_replica_if_possible(
        &self,
        container: &ContainerInfo,
        replicas: &[ContainerReplica],
        pending_ops: &[ContainerReplicaOp],
    ) -> Result<()> {
        let pending_deletes = pending_ops
            .iter()
            .filter(|op| op.kind == PendingOpKind::Delete)
            .count();

        match select_unhealthy_replica_for_delete(
            container,
            replicas,
            pending_deletes,
            self.replication.as_ref(),
        ) {
            Some(candidate) => self.replication.send_delete_command(
                container,
                candidate.replica_index,
                &candidate.datanode,
                true,
            ),
            None => {
                tracing::info!(
                    "Unable to find a replica to remove for container {}",
                    container.id
                );
                Ok(())
            }
        }
    }
}

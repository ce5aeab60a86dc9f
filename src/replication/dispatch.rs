//! Command dispatch to datanodes
//!
//! `ReplicationManager` is the interface the reconciliation handlers use to
//! query node state and hand commands to the transport. `CommandDispatcher`
//! is the in-process implementation: a node registry lookup, a bounded queue
//! drained by the datanode transport, per-node command budgets and a
//! leadership flag. Everything here is synchronous; enqueueing either
//! succeeds immediately or fails with an overload error the caller can
//! retry after re-queueing.

use crate::cluster::container::ContainerInfo;
use crate::cluster::node::{DatanodeDetails, DatanodeId, NodeRegistry, NodeStatus};
use crate::common::{timestamp_now_millis, Error, ReplicationConfig, ReplicationMetrics, Result};
use crate::replication::command::{
    DatanodeCommand, DeleteContainerCommand, ReplicateContainerCommand,
};
use crate::replication::op::{ContainerReplicaOp, PendingOpKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Node state and command transport as seen by the reconciliation handlers.
pub trait ReplicationManager: Send + Sync {
    /// Status of a datanode from the heartbeat-maintained cache. Nodes that
    /// never registered yield `NodeNotFound`.
    fn node_status(&self, datanode: &DatanodeDetails) -> Result<NodeStatus>;

    /// Queue a replication of `container` onto `target`, letting the
    /// dispatcher pick a source from the full list so load can be balanced.
    /// Push mode.
    fn send_throttled_replication(
        &self,
        container: &ContainerInfo,
        sources: &[DatanodeDetails],
        target: &DatanodeDetails,
        priority: u32,
    ) -> Result<()>;

    /// Deliver a fully formed command to one datanode. Pull-mode replication
    /// uses this with the source list embedded in the command.
    fn send_datanode_command(
        &self,
        command: DatanodeCommand,
        container: &ContainerInfo,
        target: &DatanodeDetails,
    ) -> Result<()>;

    /// Queue deletion of one replica.
    fn send_delete_command(
        &self,
        container: &ContainerInfo,
        replica_index: u32,
        target: &DatanodeDetails,
        force: bool,
    ) -> Result<()>;

    fn replication_config(&self) -> &ReplicationConfig;

    fn metrics(&self) -> &ReplicationMetrics;
}

/// A command and the datanode it must be delivered to
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    pub datanode: DatanodeDetails,
    pub command: DatanodeCommand,
}

/// In-process command dispatcher backed by a bounded queue.
pub struct CommandDispatcher {
    registry: Arc<NodeRegistry>,
    config: ReplicationConfig,
    metrics: Arc<ReplicationMetrics>,
    queue: mpsc::Sender<CommandEnvelope>,
    inflight: Mutex<HashMap<DatanodeId, usize>>,
    leader: AtomicBool,
}

impl CommandDispatcher {
    /// Create the dispatcher and the receiving end of its transport queue.
    /// The caller wires the receiver into whatever actually talks to the
    /// datanodes.
    pub fn new(
        registry: Arc<NodeRegistry>,
        config: ReplicationConfig,
        metrics: Arc<ReplicationMetrics>,
    ) -> (Self, mpsc::Receiver<CommandEnvelope>) {
        let (queue, receiver) = mpsc::channel(config.command_queue_capacity);
        let dispatcher = Self {
            registry,
            config,
            metrics,
            queue,
            inflight: Mutex::new(HashMap::new()),
            leader: AtomicBool::new(true),
        };
        (dispatcher, receiver)
    }

    /// Flip leadership. A dispatcher that is not leader refuses all sends.
    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }

    pub fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }

    /// Pending op matching a command just queued, stamped with the
    /// configured expiry so the op store can age it out.
    pub fn pending_op_for(
        &self,
        kind: PendingOpKind,
        target: DatanodeDetails,
        replica_index: u32,
    ) -> ContainerReplicaOp {
        let deadline_ms = timestamp_now_millis() + self.config.pending_op_timeout_ms;
        ContainerReplicaOp {
            kind,
            target,
            replica_index,
            deadline_ms,
        }
    }

    /// Transport acknowledgement: one command for `datanode` left the queue.
    pub fn command_completed(&self, datanode: &DatanodeId) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(count) = inflight.get_mut(datanode) {
            *count = count.saturating_sub(1);
        }
        self.metrics.queued_commands.dec();
    }

    fn queued_for(&self, datanode: &DatanodeId) -> usize {
        let inflight = self.inflight.lock().unwrap();
        inflight.get(datanode).copied().unwrap_or(0)
    }

    fn enqueue(&self, datanode: &DatanodeDetails, command: DatanodeCommand) -> Result<()> {
        if !self.is_leader() {
            return Err(Error::NotLeader(
                "replication manager is not the active leader".into(),
            ));
        }

        {
            let mut inflight = self.inflight.lock().unwrap();
            let count = inflight.entry(datanode.id).or_insert(0);
            if *count >= self.config.datanode_command_limit {
                self.metrics.commands_overloaded_total.inc();
                return Err(Error::CommandTargetOverloaded(format!(
                    "datanode {} has {} commands queued",
                    datanode.id, count
                )));
            }
            *count += 1;
        }

        let envelope = CommandEnvelope {
            datanode: datanode.clone(),
            command,
        };
        if self.queue.try_send(envelope).is_err() {
            let mut inflight = self.inflight.lock().unwrap();
            if let Some(count) = inflight.get_mut(&datanode.id) {
                *count = count.saturating_sub(1);
            }
            self.metrics.commands_overloaded_total.inc();
            return Err(Error::CommandTargetOverloaded(
                "command transport queue is full".into(),
            ));
        }
        self.metrics.queued_commands.inc();
        Ok(())
    }
}

impl ReplicationManager for CommandDispatcher {
    fn node_status(&self, datanode: &DatanodeDetails) -> Result<NodeStatus> {
        self.registry.status(&datanode.id)
    }

    fn send_throttled_replication(
        &self,
        container: &ContainerInfo,
        sources: &[DatanodeDetails],
        target: &DatanodeDetails,
        priority: u32,
    ) -> Result<()> {
        // Push the replica from the least loaded source still under budget.
        let source = sources
            .iter()
            .map(|dn| (self.queued_for(&dn.id), dn))
            .filter(|(queued, _)| *queued < self.config.datanode_command_limit)
            .min_by_key(|(queued, _)| *queued)
            .map(|(_, dn)| dn.clone());

        let Some(source) = source else {
            self.metrics.commands_overloaded_total.inc();
            return Err(Error::CommandTargetOverloaded(format!(
                "all {} replication sources for container {} are at their command limit",
                sources.len(),
                container.id
            )));
        };

        let command = ReplicateContainerCommand::to_target(container.id, target.clone())
            .with_priority(priority);
        self.enqueue(&source, DatanodeCommand::Replicate(command))?;
        self.metrics.replication_commands_sent_total.inc();
        tracing::debug!(
            "Queued push replication of container {} from {} to {}",
            container.id,
            source,
            target
        );
        Ok(())
    }

    fn send_datanode_command(
        &self,
        command: DatanodeCommand,
        container: &ContainerInfo,
        target: &DatanodeDetails,
    ) -> Result<()> {
        let kind = command.kind();
        self.enqueue(target, command)?;
        if kind == "replicate" {
            self.metrics.replication_commands_sent_total.inc();
        }
        tracing::debug!(
            "Queued {} command for container {} to {}",
            kind,
            container.id,
            target
        );
        Ok(())
    }

    fn send_delete_command(
        &self,
        container: &ContainerInfo,
        replica_index: u32,
        target: &DatanodeDetails,
        force: bool,
    ) -> Result<()> {
        let command = DeleteContainerCommand {
            container_id: container.id,
            replica_index,
            force,
        };
        self.enqueue(target, DatanodeCommand::DeleteContainer(command))?;
        self.metrics.delete_commands_sent_total.inc();
        tracing::debug!(
            "Queued delete of container {} replica on {}",
            container.id,
            target
        );
        Ok(())
    }

    fn replication_config(&self) -> &ReplicationConfig {
        &self.config
    }

    fn metrics(&self) -> &ReplicationMetrics {
        &self.metrics
    }
}

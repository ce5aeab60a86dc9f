//! Commands dispatched to datanodes

use crate::cluster::container::ContainerId;
use crate::cluster::node::DatanodeDetails;
use serde::{Deserialize, Serialize};

/// Instruction to create one new replica of a container.
///
/// Two delivery shapes exist: a pull command goes to the new replica's host
/// and names the datanodes it may copy from; a push command goes to a source
/// and names the datanode to push to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateContainerCommand {
    pub container_id: ContainerId,
    /// Datanodes holding a usable copy
    pub sources: Vec<DatanodeDetails>,
    /// Push destination; `None` when the receiving datanode pulls instead
    pub target: Option<DatanodeDetails>,
    pub priority: u32,
}

impl ReplicateContainerCommand {
    /// Pull command: delivered to the new host, copies from one of `sources`
    pub fn from_sources(container_id: ContainerId, sources: Vec<DatanodeDetails>) -> Self {
        Self {
            container_id,
            sources,
            target: None,
            priority: 0,
        }
    }

    /// Push command: delivered to a source, pushes the replica to `target`
    pub fn to_target(container_id: ContainerId, target: DatanodeDetails) -> Self {
        Self {
            container_id,
            sources: Vec::new(),
            target: Some(target),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Instruction to drop one replica of a container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteContainerCommand {
    pub container_id: ContainerId,
    pub replica_index: u32,
    /// Delete even if the replica is not empty
    pub force: bool,
}

/// Any command the SCM can address to a datanode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatanodeCommand {
    Replicate(ReplicateContainerCommand),
    DeleteContainer(DeleteContainerCommand),
}

impl DatanodeCommand {
    /// Short name for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            DatanodeCommand::Replicate(_) => "replicate",
            DatanodeCommand::DeleteContainer(_) => "delete_container",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_shapes() {
        let source = DatanodeDetails::random();
        let target = DatanodeDetails::random();

        let pull = ReplicateContainerCommand::from_sources(ContainerId(4), vec![source.clone()]);
        assert!(pull.target.is_none());
        assert_eq!(pull.sources, vec![source]);

        let push = ReplicateContainerCommand::to_target(ContainerId(4), target.clone());
        assert_eq!(push.target, Some(target));
        assert!(push.sources.is_empty());
        assert_eq!(push.with_priority(1).priority, 1);
    }

    #[test]
    fn test_command_kind() {
        let replicate = DatanodeCommand::Replicate(ReplicateContainerCommand::from_sources(
            ContainerId(1),
            vec![],
        ));
        assert_eq!(replicate.kind(), "replicate");

        let delete = DatanodeCommand::DeleteContainer(DeleteContainerCommand {
            container_id: ContainerId(1),
            replica_index: 0,
            force: true,
        });
        assert_eq!(delete.kind(), "delete_container");
    }
}

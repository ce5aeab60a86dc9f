//! Cluster model: containers, replicas and datanodes

pub mod container;
pub mod node;

pub use container::{ContainerId, ContainerInfo, ContainerReplica, LifeCycleState, ReplicaState};
pub use node::{
    DatanodeDetails, DatanodeId, DatanodeInfo, NodeHealth, NodeOperationalState, NodeRegistry,
    NodeStatus,
};

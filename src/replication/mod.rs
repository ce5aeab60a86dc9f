//! Replication management
//!
//! The background health scanner classifies containers; the code here turns
//! an under-replication verdict into datanode commands:
//! - Replica accounting under two views (with/without unhealthy replicas)
//! - Source selection restricted to the highest write epoch
//! - Pluggable target placement
//! - Bounded, throttled command dispatch with a slot-freeing fallback

pub mod command;
pub mod dispatch;
pub mod health;
pub mod op;
pub mod placement;
pub mod replica_count;
pub mod selection;
pub mod under_replication;

pub use command::{DatanodeCommand, DeleteContainerCommand, ReplicateContainerCommand};
pub use dispatch::{CommandDispatcher, CommandEnvelope, ReplicationManager};
pub use health::{ContainerHealthResult, ContainerHealthState};
pub use op::{pending_delete_nodes, ContainerReplicaOp, PendingOpKind};
pub use placement::{CapacityPlacement, PlacementPolicy};
pub use replica_count::ContainerReplicaCount;
pub use selection::{
    excluded_and_used_nodes, select_unhealthy_replica_for_delete, ExcludedAndUsedNodes,
};
pub use under_replication::UnderReplicationHandler;

//! Target placement for new replicas
//!
//! Placement is pluggable: the reconciliation handlers only depend on the
//! `PlacementPolicy` trait. Callers split the current hosts into two sets
//! with different meanings: `used` nodes keep their weight in topology
//! reasoning but must not receive another replica, while `excluded` nodes
//! are invisible to the policy entirely.

use crate::cluster::node::{DatanodeDetails, NodeOperationalState, NodeRegistry};
use crate::common::{format_bytes, Error, Result};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Chooses datanodes to host new container replicas.
pub trait PlacementPolicy: Send + Sync {
    /// Choose up to `count` targets able to hold `container_size` bytes and
    /// still keep `free_minimum` bytes spare.
    ///
    /// Returning fewer than `count` nodes is a legal short yield; returning
    /// `Error::NoSuitableDatanodes` means the cluster cannot satisfy any of
    /// the request. Any other error is treated as fatal by callers.
    fn choose_datanodes(
        &self,
        used: &[DatanodeDetails],
        excluded: &[DatanodeDetails],
        favored: &[DatanodeDetails],
        count: usize,
        container_size: u64,
        free_minimum: u64,
    ) -> Result<Vec<DatanodeDetails>>;
}

/// Free-space driven placement over the node registry.
///
/// Healthy in-service nodes with enough free space are ranked most-free
/// first; favored nodes jump the queue. Ties are broken randomly so repeated
/// placements spread across equally loaded nodes.
pub struct CapacityPlacement {
    registry: Arc<NodeRegistry>,
}

impl CapacityPlacement {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }
}

impl PlacementPolicy for CapacityPlacement {
    fn choose_datanodes(
        &self,
        used: &[DatanodeDetails],
        excluded: &[DatanodeDetails],
        favored: &[DatanodeDetails],
        count: usize,
        container_size: u64,
        free_minimum: u64,
    ) -> Result<Vec<DatanodeDetails>> {
        let required_free = container_size + free_minimum;
        let mut candidates: Vec<_> = self
            .registry
            .list()
            .into_iter()
            .filter(|n| {
                n.status.is_healthy()
                    && n.status.operational_state == NodeOperationalState::InService
            })
            .filter(|n| !used.contains(&n.details) && !excluded.contains(&n.details))
            .filter(|n| n.free_bytes >= required_free)
            .collect();

        if candidates.is_empty() {
            return Err(Error::NoSuitableDatanodes(format!(
                "no healthy in-service datanode with {} free",
                format_bytes(required_free)
            )));
        }

        candidates.shuffle(&mut rand::thread_rng());
        candidates.sort_by(|a, b| b.free_bytes.cmp(&a.free_bytes));
        if !favored.is_empty() {
            candidates.sort_by_key(|n| !favored.contains(&n.details));
        }

        let chosen: Vec<_> = candidates
            .into_iter()
            .take(count)
            .map(|n| n.details)
            .collect();
        tracing::debug!(
            "Placement chose {} of {} requested targets ({} each)",
            chosen.len(),
            count,
            format_bytes(container_size)
        );
        Ok(chosen)
    }
}

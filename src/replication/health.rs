//! Container health classification results
//!
//! Produced by the background health scanner and consumed by the
//! reconciliation handlers as immutable input. The handlers never
//! re-classify; they only re-verify against pending work.

use crate::cluster::container::ContainerInfo;
use serde::{Deserialize, Serialize};

/// Health verdict for one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerHealthState {
    Healthy,
    UnderReplicated,
    OverReplicated,
    /// No usable replica is left anywhere
    Unrecoverable,
}

/// A container together with its health verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHealthResult {
    pub container: ContainerInfo,
    pub state: ContainerHealthState,
}

impl ContainerHealthResult {
    pub fn new(container: ContainerInfo, state: ContainerHealthState) -> Self {
        Self { container, state }
    }

    pub fn under_replicated(container: ContainerInfo) -> Self {
        Self::new(container, ContainerHealthState::UnderReplicated)
    }
}

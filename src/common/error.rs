//! Error types for miniscm

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Leadership Errors ===
    #[error("Not leader: {0}")]
    NotLeader(String),

    // === Node Errors ===
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // === Placement Errors ===
    #[error("No suitable datanodes: {0}")]
    NoSuitableDatanodes(String),

    #[error("Placement policy failed: {0}")]
    Placement(String),

    #[error("Insufficient datanodes: need {needed}, found {found}")]
    InsufficientDatanodes { needed: usize, found: usize },

    // === Command Transport Errors ===
    #[error("Command target overloaded: {0}")]
    CommandTargetOverloaded(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Should the caller re-queue the work and try again later? Losing
    /// leadership is not retryable: the caller abandons the iteration and a
    /// new leader starts from a fresh snapshot.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::NoSuitableDatanodes(_)
                | Error::InsufficientDatanodes { .. }
                | Error::CommandTargetOverloaded(_)
        )
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

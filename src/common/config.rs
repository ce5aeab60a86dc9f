//! Configuration for miniscm components

use serde::{Deserialize, Serialize};

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SCM instance ID (unique identifier)
    pub scm_id: String,

    /// Replication management config
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Replication management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Nominal container size in bytes, passed to the placement policy for
    /// free-space planning
    #[serde(default = "default_container_size")]
    pub container_size: u64,

    /// Push replication: source datanodes push replicas to targets. When
    /// false, targets are told to pull from the source list instead.
    #[serde(default = "default_true")]
    pub push: bool,

    /// Healthy replicas that must remain outside maintenance before a node
    /// may enter it
    #[serde(default = "default_min_healthy_for_maintenance")]
    pub min_healthy_for_maintenance: u32,

    /// Commands a single datanode may have queued before the throttled send
    /// refuses more work
    #[serde(default = "default_datanode_command_limit")]
    pub datanode_command_limit: usize,

    /// Depth of the bounded command transport queue
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,

    /// Expiry horizon stamped on newly created pending ops (milliseconds)
    #[serde(default = "default_pending_op_timeout_ms")]
    pub pending_op_timeout_ms: u64,
}

fn default_container_size() -> u64 {
    5 * 1024 * 1024 * 1024 // 5 GiB
}
fn default_true() -> bool {
    true
}
fn default_min_healthy_for_maintenance() -> u32 {
    2
}
fn default_datanode_command_limit() -> usize {
    20
}
fn default_command_queue_capacity() -> usize {
    1024
}
fn default_pending_op_timeout_ms() -> u64 {
    600_000 // 10 minutes
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            container_size: default_container_size(),
            push: true,
            min_healthy_for_maintenance: default_min_healthy_for_maintenance(),
            datanode_command_limit: default_datanode_command_limit(),
            command_queue_capacity: default_command_queue_capacity(),
            pending_op_timeout_ms: default_pending_op_timeout_ms(),
        }
    }
}

impl ReplicationConfig {
    /// Validate replication settings
    pub fn validate(&self) -> crate::Result<()> {
        if self.container_size == 0 {
            return Err(crate::Error::InvalidConfig(
                "container_size must be positive".into(),
            ));
        }
        if self.command_queue_capacity == 0 {
            return Err(crate::Error::InvalidConfig(
                "command_queue_capacity must be positive".into(),
            ));
        }
        if self.datanode_command_limit == 0 {
            return Err(crate::Error::InvalidConfig(
                "datanode_command_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| crate::Error::Other(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save to file
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| crate::Error::Other(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.scm_id.is_empty() {
            return Err(crate::Error::InvalidConfig("scm_id is required".into()));
        }
        self.replication.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replication_defaults() {
        let config = ReplicationConfig::default();
        assert_eq!(config.container_size, 5 * 1024 * 1024 * 1024);
        assert!(config.push);
        assert_eq!(config.min_healthy_for_maintenance, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_queue() {
        let config = ReplicationConfig {
            command_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_requires_scm_id() {
        let config = Config {
            scm_id: String::new(),
            replication: ReplicationConfig::default(),
            log_level: "info".to_string(),
        };
        assert!(config.validate().is_err());
    }
}

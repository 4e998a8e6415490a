use std::path::Path;
use std::time::Duration;

use ringlet_lib::DEFAULT_ID_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a ChordNode
///
/// Every field has a default, so a config file only needs the values it
/// overrides. Durations use humantime notation (`"30s"`, `"500ms"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transport address other peers use to reach this node. Also hashed into the node id.
    pub peer_id: String,
    pub api_address: String,
    /// Identifier width in bytes.
    pub id_size: usize,
    #[serde(with = "humantime_serde")]
    pub stabilize_task_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub fix_finger_task_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub check_predecessor_task_interval: Duration,
    pub successor_list_size: usize,
    pub max_notify_and_copy_attempts: usize,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub connection_pool_size: usize,
    #[serde(with = "humantime_serde")]
    pub connection_close_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub silent_connection_close_timeout: Duration,
    /// Laps a FIND_SUCCESSOR lookup may make around its starting node.
    pub max_round_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            peer_id: "127.0.0.1:8000".to_string(),
            api_address: "127.0.0.1:9000".to_string(),
            id_size: DEFAULT_ID_SIZE,
            stabilize_task_interval: Duration::from_secs(30),
            fix_finger_task_interval: Duration::from_secs(30),
            check_predecessor_task_interval: Duration::from_secs(30),
            successor_list_size: 3,
            max_notify_and_copy_attempts: 5,
            request_timeout: Duration::from_secs(180),
            connection_pool_size: 10,
            connection_close_delay: Duration::from_secs(5),
            silent_connection_close_timeout: Duration::from_secs(30),
            max_round_count: 1,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `NODE_ADDRESS` and `API_ADDRESS` overrides from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(address) = std::env::var("NODE_ADDRESS") {
            self.peer_id = address;
        }
        if let Ok(address) = std::env::var("API_ADDRESS") {
            self.api_address = address;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_id.is_empty() {
            return Err(ConfigError::Invalid("peer_id must not be empty".to_string()));
        }
        if self.id_size == 0 || self.id_size > DEFAULT_ID_SIZE {
            return Err(ConfigError::Invalid(format!(
                "id_size must be between 1 and {}",
                DEFAULT_ID_SIZE
            )));
        }
        if self.successor_list_size == 0 {
            return Err(ConfigError::Invalid(
                "successor_list_size must be positive".to_string(),
            ));
        }
        if self.max_notify_and_copy_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_notify_and_copy_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

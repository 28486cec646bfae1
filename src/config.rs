//! Runtime configuration for the database handle and controllers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables for [`crate::runtime::database::SleepDatabase`] and the controllers.
///
/// Missing JSON fields fall back to [`SleepConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    /// SQLite file. `None` opens a private in-memory database.
    pub database_path: Option<PathBuf>,
    /// Bound of the DAO command queue.
    pub command_queue_bound: usize,
    /// Capacity of the DAO change-event broadcast.
    pub event_capacity: usize,
    /// Bound of each controller's action queue.
    pub action_queue_bound: usize,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            command_queue_bound: 64,
            event_capacity: 256,
            action_queue_bound: 16,
        }
    }
}

impl SleepConfig {
    /// Config backed by the SQLite file at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

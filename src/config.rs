//! Configuration Module
//!
//! Engine options, loadable from environment variables or deserialized from
//! the owning cache's configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Engine configuration parameters.
///
/// Keys beyond these are engine-specific and never read by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace applied to keys, empty when unset
    pub prefix: String,
    /// Snapshot location for persistent engines
    pub path: Option<PathBuf>,
    /// Background purge interval in seconds
    pub purge_interval_secs: u64,
}

impl EngineConfig {
    /// Creates a new EngineConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENGINE_PREFIX` - Key namespace (default: empty)
    /// - `CACHE_ENGINE_PATH` - Snapshot file for the file engine (default: none)
    /// - `CACHE_ENGINE_PURGE_INTERVAL` - Purge frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        Self {
            prefix: env::var("CACHE_ENGINE_PREFIX").unwrap_or_default(),
            path: env::var("CACHE_ENGINE_PATH").ok().map(PathBuf::from),
            purge_interval_secs: env::var("CACHE_ENGINE_PURGE_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }

    /// Background purge interval, rejecting zero.
    pub fn purge_interval(&self) -> Result<Duration> {
        if self.purge_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "purge interval must be at least 1 second".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.purge_interval_secs))
    }

    pub fn with_purge_interval_secs(mut self, secs: u64) -> Self {
        self.purge_interval_secs = secs;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            path: None,
            purge_interval_secs: 1,
        }
    }
}

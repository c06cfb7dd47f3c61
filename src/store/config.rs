//! Database configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};

/// Engine-level settings shared by every collection of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Seconds between TTL reaper sweeps (default 60)
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,

    /// Whether `find` and `aggregate` see soft-deleted documents when the
    /// caller does not say (default false)
    #[serde(default)]
    pub include_deleted: bool,
}

fn default_reaper_interval_secs() -> u64 {
    60
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            reaper_interval_secs: default_reaper_interval_secs(),
            include_deleted: false,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> StoreResult<()> {
        if self.reaper_interval_secs == 0 {
            return Err(StoreError::invalid_document(
                "reaper_interval_secs must be > 0",
            ));
        }
        Ok(())
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }
}

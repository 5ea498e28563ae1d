//! Ledger file location and writer settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_path() -> PathBuf {
    PathBuf::from("ledger/decision_influence_log.jsonl")
}

/// Default wait for another writer to release the ledger lock.
const fn default_lock_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Ledger file, relative to the working directory unless absolute.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Seconds to wait for the write lock before giving up.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl LedgerConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("ledger.path", "must not be empty"));
        }
        Ok(())
    }
}

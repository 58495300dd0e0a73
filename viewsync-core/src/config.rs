use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

fn default_call_timeout_secs() -> u64 {
    30
}

/// Settings shared by every synchronisation request. Built once at startup
/// and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upper bound for any single collaborator call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            call_timeout_secs = self.call_timeout_secs,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

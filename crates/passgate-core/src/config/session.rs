//! Session orchestration configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound for each store or cache call, in milliseconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
    /// Revoke the owning session when an already-rotated refresh token is
    /// presented again.
    #[serde(default)]
    pub revoke_on_refresh_reuse: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout(),
            revoke_on_refresh_reuse: false,
        }
    }
}

impl SessionConfig {
    /// Bound applied to every collaborator call.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn default_operation_timeout() -> u64 {
    5000
}

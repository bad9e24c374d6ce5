//! Token signing and lifetime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Smallest accepted amount of entropy, in bytes, for a refresh-token value.
pub const MIN_REFRESH_TOKEN_BYTES: usize = 64;

/// Token signing and lifetime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for access-token signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: u64,
    /// Random bytes drawn per refresh token before encoding.
    #[serde(default = "default_refresh_bytes")]
    pub refresh_token_bytes: usize,
    /// Clock skew tolerated when checking access-token expiry, in seconds.
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_ttl_minutes: default_access_ttl(),
            refresh_token_ttl_days: default_refresh_ttl(),
            refresh_token_bytes: default_refresh_bytes(),
            leeway_seconds: 0,
        }
    }
}

impl AuthConfig {
    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_minutes * 60)
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_days * 24 * 60 * 60)
    }

    /// Reject settings that would weaken issued credentials.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt_secret.is_empty() {
            return Err(AppError::configuration("auth.jwt_secret must not be empty"));
        }
        if self.refresh_token_bytes < MIN_REFRESH_TOKEN_BYTES {
            return Err(AppError::configuration(format!(
                "auth.refresh_token_bytes must be at least {MIN_REFRESH_TOKEN_BYTES}"
            )));
        }
        if self.access_token_ttl_minutes == 0 || self.refresh_token_ttl_days == 0 {
            return Err(AppError::configuration("token lifetimes must be positive"));
        }
        Ok(())
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    90
}

fn default_refresh_bytes() -> usize {
    MIN_REFRESH_TOKEN_BYTES
}

//! Durable store settings.
//!
//! Only the connection URL is required. Pool bounds default to values that
//! suit a single Passgate node sharing PostgreSQL with other services.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Connection settings for the PostgreSQL session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. May carry credentials, so it is never logged.
    pub url: String,
    /// Reported as `application_name` in `pg_stat_activity`.
    #[serde(default = "default_application_name")]
    pub application_name: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long a caller waits for a pooled connection, in milliseconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,
    /// Idle connections above `min_connections` are closed after this many
    /// seconds. Zero keeps them open.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Settings for `url` with every other field at its default.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            application_name: default_application_name(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_ms: default_acquire_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }

    /// Wait bound for checking a connection out of the pool.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Idle lifetime of surplus connections, if any.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_seconds > 0).then(|| Duration::from_secs(self.idle_timeout_seconds))
    }

    /// Reject pool bounds sqlx would refuse or silently clamp.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.is_empty() {
            return Err(AppError::configuration("database.url must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(AppError::configuration(
                "database.max_connections must be positive",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(AppError::configuration(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(AppError::configuration(
                "database.acquire_timeout_ms must be positive",
            ));
        }
        Ok(())
    }
}

fn default_application_name() -> String {
    "passgate".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    3000
}

fn default_idle_timeout() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_url_uses_defaults() {
        let config = DatabaseConfig::with_url("postgres://localhost/passgate");
        assert_eq!(config.application_name, "passgate");
        assert_eq!(config.acquire_timeout(), Duration::from_secs(3));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_idle_timeout_disables_reaping() {
        let config = DatabaseConfig {
            idle_timeout_seconds: 0,
            ..DatabaseConfig::with_url("postgres://localhost/passgate")
        };
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_inverted_pool_bounds_rejected() {
        let config = DatabaseConfig {
            min_connections: 30,
            ..DatabaseConfig::with_url("postgres://localhost/passgate")
        };
        assert!(config.validate().is_err());

        let config = DatabaseConfig {
            max_connections: 0,
            min_connections: 0,
            ..DatabaseConfig::with_url("postgres://localhost/passgate")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(DatabaseConfig::with_url("").validate().is_err());
    }
}

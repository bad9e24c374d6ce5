//! PostgreSQL pool for the session and refresh-token tables.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use passgate_core::config::database::DatabaseConfig;
use passgate_core::error::{AppError, ErrorKind};

/// Shared handle to the durable store.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Opens the pool described by `config`.
    ///
    /// Only host, port, and database name are logged; credentials in the URL
    /// never reach the log.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = connect_options(config)?;
        info!(
            host = options.get_host(),
            port = options.get_port(),
            database = options.get_database().unwrap_or("-"),
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Could not reach PostgreSQL", e)
            })?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Borrow the sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Hand the sqlx pool to the repositories.
    pub fn into_pool(self) -> PgPool {
        self.pool
    }

    /// Round-trips a trivial query.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))?;
        Ok(one == 1)
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, AppError> {
    let options = PgConnectOptions::from_str(&config.url).map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, "database.url is not a valid URL", e)
    })?;
    Ok(options.application_name(&config.application_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            application_name: "passgate-test".to_string(),
            ..DatabaseConfig::with_url(url)
        }
    }

    #[test]
    fn test_connect_options_parse_url() {
        let options =
            connect_options(&config("postgres://passgate:secret@db:6543/sessions")).unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("sessions"));
        assert_eq!(options.get_application_name(), Some("passgate-test"));
    }

    #[test]
    fn test_connect_options_reject_garbage() {
        let err = connect_options(&config("postgres://db:not-a-port/x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}

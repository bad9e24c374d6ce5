//! Connectivity check for the durable store and the cache.

use passgate_cache::CacheManager;
use passgate_core::config::AppConfig;
use passgate_core::error::AppError;
use passgate_core::traits::cache::CacheProvider;

use crate::{output, services};

/// Probe both backends and report each one
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let db = services::connect_database(config).await?;
    let database_ok = db.health_check().await.unwrap_or(false);
    db.close().await;

    let cache = CacheManager::new(&config.cache).await?;
    let cache_ok = cache.health_check().await.unwrap_or(false);

    output::print_kv("database", if database_ok { "ok" } else { "unreachable" });
    output::print_kv(
        &format!("cache ({})", config.cache.provider),
        if cache_ok { "ok" } else { "unreachable" },
    );

    if database_ok && cache_ok {
        output::print_success("All backends reachable.");
        Ok(())
    } else {
        Err(AppError::service_unavailable("One or more backends are unreachable"))
    }
}

//! Wires the session stack from configuration.

use std::sync::Arc;

use tracing::info;

use passgate_auth::{
    PasswordHasher, PasswordIdentityProvider, SessionOrchestrator, TokenCodec, Validator,
};
use passgate_cache::CacheManager;
use passgate_core::config::AppConfig;
use passgate_core::error::AppError;
use passgate_database::DatabasePool;
use passgate_database::repositories::refresh_token::RefreshTokenRepository;
use passgate_database::repositories::session::SessionRepository;
use passgate_database::repositories::user::UserRepository;

/// Connect to the database, without touching the cache.
pub async fn connect_database(config: &AppConfig) -> Result<DatabasePool, AppError> {
    info!("Connecting to database...");
    DatabasePool::connect(&config.database).await
}

/// Build a session orchestrator over Postgres and the configured cache.
pub async fn orchestrator(config: &AppConfig) -> Result<SessionOrchestrator, AppError> {
    let db = connect_database(config).await?;
    let pool = db.into_pool();

    info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = CacheManager::new(&config.cache).await?;

    let users = Arc::new(UserRepository::new(pool.clone()));
    let identity = PasswordIdentityProvider::new(users, PasswordHasher::new())?;
    let codec = TokenCodec::new(&config.auth)?;

    Ok(SessionOrchestrator::new(
        Arc::new(SessionRepository::new(pool.clone())),
        Arc::new(RefreshTokenRepository::new(pool)),
        Arc::new(identity),
        cache,
        Arc::new(codec),
        config.session.clone(),
    ))
}

/// Build a standalone validator; it reads only the cache.
pub async fn validator(config: &AppConfig) -> Result<(Validator, Arc<TokenCodec>), AppError> {
    let codec = Arc::new(TokenCodec::new(&config.auth)?);
    let cache = CacheManager::new(&config.cache).await?;
    let validator = Validator::new(codec.clone(), cache, config.session.operation_timeout());
    Ok((validator, codec))
}

//! Shared fixtures for session lifecycle tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use passgate_auth::{CredentialCheck, IdentityProvider, SessionOrchestrator, TokenCodec};
use passgate_cache::CacheManager;
use passgate_cache::memory::MemoryCacheProvider;
use passgate_core::config::auth::AuthConfig;
use passgate_core::config::cache::MemoryCacheConfig;
use passgate_core::config::session::SessionConfig;
use passgate_core::error::AppError;
use passgate_core::result::AppResult;
use passgate_core::traits::cache::CacheProvider;
use passgate_database::MemoryStore;
use passgate_database::store::SessionStore;
use passgate_entity::session::{NewSession, Session, SessionActivity};
use passgate_entity::user::UserProfile;

pub const PASSWORD: &str = "correct horse battery staple";

/// Identity provider with plaintext secrets, so tests skip Argon2.
#[derive(Debug, Default)]
pub struct StubIdentity {
    accounts: Mutex<HashMap<String, (String, UserProfile)>>,
}

impl StubIdentity {
    pub fn add(&self, email: &str, active: bool) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            roles: vec!["member".to_string()],
            is_active: active,
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_lowercase(), (PASSWORD.to_string(), profile.clone()));
        profile
    }

    pub fn set_active(&self, user_id: Uuid, active: bool) {
        for (_, profile) in self.accounts.lock().unwrap().values_mut() {
            if profile.id == user_id {
                profile.is_active = active;
            }
        }
    }

    pub fn remove(&self, user_id: Uuid) {
        self.accounts
            .lock()
            .unwrap()
            .retain(|_, (_, profile)| profile.id != user_id);
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn authenticate(&self, email: &str, secret: &str) -> AppResult<CredentialCheck> {
        let accounts = self.accounts.lock().unwrap();
        Ok(match accounts.get(&email.to_lowercase()) {
            Some((expected, _)) if expected != secret => CredentialCheck::InvalidCredentials,
            Some((_, profile)) if !profile.is_active => CredentialCheck::AccountInactive,
            Some((_, profile)) => CredentialCheck::Verified(profile.clone()),
            None => CredentialCheck::InvalidCredentials,
        })
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .values()
            .map(|(_, profile)| profile)
            .find(|profile| profile.id == user_id)
            .cloned())
    }
}

/// Cache whose every call fails.
#[derive(Debug)]
pub struct FailingCache;

#[async_trait]
impl CacheProvider for FailingCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::cache("cache unreachable"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Err(AppError::cache("cache unreachable"))
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Err(AppError::cache("cache unreachable"))
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Err(AppError::cache("cache unreachable"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}

/// Cache that answers correctly but only after a delay.
#[derive(Debug)]
pub struct SlowCache {
    pub inner: MemoryCacheProvider,
    pub delay: Duration,
}

#[async_trait]
impl CacheProvider for SlowCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.exists(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Session store that sees every refresh land on a session revoked in the
/// meantime: `record_refresh` matches no row.
#[derive(Debug, Clone)]
pub struct RevokedMidRefresh(pub MemoryStore);

#[async_trait]
impl SessionStore for RevokedMidRefresh {
    async fn insert(&self, new: &NewSession) -> AppResult<Session> {
        SessionStore::insert(&self.0, new).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        SessionStore::find_by_id(&self.0, id).await
    }

    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>> {
        self.0.find_by_session_id(session_id).await
    }

    async fn find_active_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>> {
        self.0.find_active_by_session_id(session_id).await
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.0.find_active_by_user(user_id).await
    }

    async fn record_refresh(&self, _id: Uuid, _activity: &SessionActivity) -> AppResult<bool> {
        Ok(false)
    }

    async fn touch(&self, session_id: &str) -> AppResult<bool> {
        self.0.touch(session_id).await
    }

    async fn revoke(&self, session_id: &str, reason: &str) -> AppResult<bool> {
        SessionStore::revoke(&self.0, session_id, reason).await
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, reason: &str) -> AppResult<Vec<String>> {
        self.0.revoke_all_for_user(user_id, reason).await
    }
}

pub fn memory_cache() -> CacheManager {
    CacheManager::from_provider(Arc::new(MemoryCacheProvider::new(
        &MemoryCacheConfig::default(),
    )))
}

pub fn codec() -> Arc<TokenCodec> {
    Arc::new(
        TokenCodec::new(&AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            ..AuthConfig::default()
        })
        .unwrap(),
    )
}

pub struct Harness {
    pub store: MemoryStore,
    pub identity: Arc<StubIdentity>,
    pub cache: CacheManager,
    pub orchestrator: SessionOrchestrator,
}

pub fn harness() -> Harness {
    harness_with(SessionConfig::default(), memory_cache())
}

pub fn harness_with(config: SessionConfig, cache: CacheManager) -> Harness {
    let store = MemoryStore::new();
    harness_over(store.clone(), Arc::new(store), config, cache)
}

/// Harness whose orchestrator reads and writes sessions through `sessions`
/// while refresh tokens stay in `store`.
pub fn harness_over(
    store: MemoryStore,
    sessions: Arc<dyn SessionStore>,
    config: SessionConfig,
    cache: CacheManager,
) -> Harness {
    let identity = Arc::new(StubIdentity::default());
    let orchestrator = SessionOrchestrator::new(
        sessions,
        Arc::new(store.clone()),
        identity.clone(),
        cache.clone(),
        codec(),
        config,
    );
    Harness {
        store,
        identity,
        cache,
        orchestrator,
    }
}

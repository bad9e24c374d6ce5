//! Credential checks.
//!
//! The session layer never compares passwords itself; it asks an
//! [`IdentityProvider`] whether an email/secret pair identifies an account
//! and whether that account may hold sessions.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use passgate_core::error::AppError;
use passgate_core::result::AppResult;
use passgate_database::store::UserStore;
use passgate_entity::user::{User, UserProfile};

use crate::password::PasswordHasher;

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    /// The secret matches an active account.
    Verified(UserProfile),
    /// Unknown email or wrong secret. The two are not distinguished.
    InvalidCredentials,
    /// The secret matches but the account is deactivated.
    AccountInactive,
}

/// Source of account identity for the session layer.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Check an email/secret pair.
    async fn authenticate(&self, email: &str, secret: &str) -> AppResult<CredentialCheck>;

    /// Current profile of an account, or `None` if it no longer exists.
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>>;
}

/// Identity provider backed by a [`UserStore`] and Argon2 password hashes.
pub struct PasswordIdentityProvider {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    /// Verified against when the email is unknown so both paths cost the same.
    decoy_hash: String,
}

impl std::fmt::Debug for PasswordIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordIdentityProvider").finish_non_exhaustive()
    }
}

impl PasswordIdentityProvider {
    /// Creates a provider over a user store.
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> AppResult<Self> {
        let decoy_hash = hasher.hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            users,
            hasher,
            decoy_hash,
        })
    }

    /// Runs Argon2 off the async worker threads.
    async fn verify(&self, secret: &str, hash: &str) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_password(&secret, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
    }

    async fn profile(&self, user: &User) -> AppResult<UserProfile> {
        let roles = self.users.roles_for(user.id).await?;
        Ok(user.profile(roles))
    }
}

#[async_trait]
impl IdentityProvider for PasswordIdentityProvider {
    async fn authenticate(&self, email: &str, secret: &str) -> AppResult<CredentialCheck> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .filter(|u| !u.is_deleted);

        let Some(user) = user else {
            self.verify(secret, &self.decoy_hash).await?;
            return Ok(CredentialCheck::InvalidCredentials);
        };

        if !self.verify(secret, &user.password_hash).await? {
            return Ok(CredentialCheck::InvalidCredentials);
        }

        if !user.can_login() {
            return Ok(CredentialCheck::AccountInactive);
        }

        Ok(CredentialCheck::Verified(self.profile(&user).await?))
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        match self.users.find_by_id(user_id).await? {
            Some(user) if !user.is_deleted => Ok(Some(self.profile(&user).await?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use passgate_database::MemoryStore;

    fn user(email: &str, password_hash: String, is_active: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash,
            email_verified: true,
            is_active,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_authenticate_outcomes() {
        let hasher = PasswordHasher::new();
        let store = MemoryStore::new();
        let hash = hasher.hash_password("s3cret").unwrap();
        let active = user("ada@example.com", hash.clone(), true);
        let inactive = user("bob@example.com", hash, false);
        store
            .put_user(active.clone(), vec!["admin".to_string()])
            .await;
        store.put_user(inactive, Vec::new()).await;

        let provider =
            PasswordIdentityProvider::new(Arc::new(store.clone()), hasher).unwrap();

        match provider.authenticate("ADA@example.com", "s3cret").await.unwrap() {
            CredentialCheck::Verified(profile) => {
                assert_eq!(profile.id, active.id);
                assert_eq!(profile.roles, vec!["admin".to_string()]);
            }
            other => panic!("expected verified, got {other:?}"),
        }
        assert_eq!(
            provider.authenticate("ada@example.com", "wrong").await.unwrap(),
            CredentialCheck::InvalidCredentials
        );
        assert_eq!(
            provider.authenticate("nobody@example.com", "s3cret").await.unwrap(),
            CredentialCheck::InvalidCredentials
        );
        assert_eq!(
            provider.authenticate("bob@example.com", "wrong").await.unwrap(),
            CredentialCheck::InvalidCredentials
        );
        assert_eq!(
            provider.authenticate("bob@example.com", "s3cret").await.unwrap(),
            CredentialCheck::AccountInactive
        );
    }

    #[tokio::test]
    async fn test_deactivation_takes_effect_immediately() {
        let hasher = PasswordHasher::new();
        let store = MemoryStore::new();
        let account = user("ada@example.com", hasher.hash_password("s3cret").unwrap(), true);
        store.put_user(account.clone(), Vec::new()).await;
        let provider =
            PasswordIdentityProvider::new(Arc::new(store.clone()), hasher).unwrap();

        assert!(store.set_user_active(account.id, false).await);
        assert_eq!(
            provider.authenticate("ada@example.com", "s3cret").await.unwrap(),
            CredentialCheck::AccountInactive
        );
        let profile = provider.find_user(account.id).await.unwrap().unwrap();
        assert!(!profile.is_active);

        assert!(store.set_user_active(account.id, true).await);
        assert!(matches!(
            provider.authenticate("ada@example.com", "s3cret").await.unwrap(),
            CredentialCheck::Verified(_)
        ));
        assert!(!store.set_user_active(Uuid::new_v4(), true).await);
    }
}

//! In-memory implementation of every store trait.
//!
//! All state lives behind one Tokio mutex, so each trait method is a single
//! critical section and the conditional transitions are trivially atomic.
//! Suitable for single-node deployments and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use passgate_core::error::AppError;
use passgate_core::result::AppResult;
use passgate_entity::session::{
    NewRefreshToken, NewSession, RefreshToken, Session, SessionActivity,
};
use passgate_entity::user::User;

use crate::store::{RefreshTokenStore, RotationOutcome, SessionStore, UserStore};

#[derive(Debug, Default)]
struct InnerState {
    sessions: HashMap<Uuid, Session>,
    /// Public session id to storage key.
    session_index: HashMap<String, Uuid>,
    /// Keyed by token value.
    tokens: HashMap<String, RefreshToken>,
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Vec<String>>,
}

impl InnerState {
    fn insert_token(
        &mut self,
        new: &NewRefreshToken,
        now: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        if self.tokens.contains_key(&new.token) {
            return Err(AppError::conflict("Refresh token value already exists"));
        }
        if !self.sessions.contains_key(&new.session_id) {
            return Err(AppError::database("Refresh token references unknown session"));
        }
        let token = RefreshToken {
            id: Uuid::now_v7(),
            token: new.token.clone(),
            session_id: new.session_id,
            expires_at: new.expires_at,
            revoked: false,
            revoked_reason: None,
            replaced_by_token: None,
            created_at: now,
            updated_at: now,
        };
        self.tokens.insert(token.token.clone(), token.clone());
        Ok(token)
    }

    fn revoke_tokens_of(&mut self, session_row: Uuid, reason: &str, now: DateTime<Utc>) {
        for token in self.tokens.values_mut() {
            if token.session_id == session_row && !token.revoked {
                token.revoked = true;
                token.revoked_reason = Some(reason.to_string());
                token.updated_at = now;
            }
        }
    }

    fn session_by_public_id(&self, session_id: &str) -> Option<&Session> {
        self.session_index
            .get(session_id)
            .and_then(|id| self.sessions.get(id))
    }
}

/// Mutex-protected in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account together with its role labels.
    pub async fn put_user(&self, user: User, roles: Vec<String>) {
        let mut state = self.state.lock().await;
        state.roles.insert(user.id, roles);
        state.users.insert(user.id, user);
    }

    /// Flip the activation flag of an account. Returns `false` if unknown.
    pub async fn set_user_active(&self, user_id: Uuid, active: bool) -> bool {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Every refresh token ever issued for a session, oldest first.
    pub async fn tokens_for_session(&self, session_row: Uuid) -> Vec<RefreshToken> {
        let state = self.state.lock().await;
        let mut tokens: Vec<RefreshToken> = state
            .tokens
            .values()
            .filter(|t| t.session_id == session_row)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| (t.created_at, t.id));
        tokens
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, new: &NewSession) -> AppResult<Session> {
        let mut state = self.state.lock().await;
        if state.session_index.contains_key(&new.session_id) {
            return Err(AppError::conflict("Session identifier already exists"));
        }
        let now = Utc::now();
        let session = Session {
            id: Uuid::now_v7(),
            session_id: new.session_id.clone(),
            user_id: new.user_id,
            ip_address: new.ip_address.clone(),
            device_info: new.device_info.clone(),
            location: new.location.clone(),
            last_active: now,
            expires_at: new.expires_at,
            revoked: false,
            revoked_reason: None,
            created_at: now,
            updated_at: now,
        };
        state
            .session_index
            .insert(session.session_id.clone(), session.id);
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>> {
        Ok(self
            .state
            .lock()
            .await
            .session_by_public_id(session_id)
            .cloned())
    }

    async fn find_active_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .state
            .lock()
            .await
            .session_by_public_id(session_id)
            .filter(|s| s.is_active_at(now))
            .cloned())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let state = self.state.lock().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_active_at(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn record_refresh(&self, id: Uuid, activity: &SessionActivity) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&id) {
            Some(session) if !session.revoked => {
                let now = Utc::now();
                session.last_active = now;
                session.ip_address = activity.ip_address.clone();
                session.device_info = activity.device_info.clone();
                session.expires_at = activity.expires_at;
                session.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch(&self, session_id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(id) = state.session_index.get(session_id).copied() else {
            return Ok(false);
        };
        let now = Utc::now();
        match state.sessions.get_mut(&id) {
            Some(session) if session.is_active_at(now) => {
                session.last_active = now;
                session.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, session_id: &str, reason: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(id) = state.session_index.get(session_id).copied() else {
            return Ok(false);
        };
        let now = Utc::now();
        let revoked = match state.sessions.get_mut(&id) {
            Some(session) if !session.revoked => {
                session.revoked = true;
                session.revoked_reason = Some(reason.to_string());
                session.updated_at = now;
                true
            }
            _ => false,
        };
        state.revoke_tokens_of(id, reason, now);
        Ok(revoked)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, reason: &str) -> AppResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut revoked = Vec::new();
        for session in state.sessions.values_mut() {
            if session.user_id == user_id && !session.revoked {
                session.revoked = true;
                session.revoked_reason = Some(reason.to_string());
                session.updated_at = now;
                revoked.push((session.id, session.session_id.clone()));
            }
        }
        for (row, _) in &revoked {
            state.revoke_tokens_of(*row, reason, now);
        }
        Ok(revoked.into_iter().map(|(_, sid)| sid).collect())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert(&self, new: &NewRefreshToken) -> AppResult<RefreshToken> {
        self.state.lock().await.insert_token(new, Utc::now())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self.state.lock().await.tokens.get(token).cloned())
    }

    async fn find_active_by_session(&self, session_row: Uuid) -> AppResult<Option<RefreshToken>> {
        let now = Utc::now();
        let state = self.state.lock().await;
        Ok(state
            .tokens
            .values()
            .filter(|t| t.session_id == session_row && t.is_usable_at(now))
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn revoke(&self, token: &str, reason: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.tokens.get_mut(token) {
            Some(t) if !t.revoked => {
                t.revoked = true;
                t.revoked_reason = Some(reason.to_string());
                t.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rotate(
        &self,
        consumed: &str,
        successor: &NewRefreshToken,
        reason: &str,
    ) -> AppResult<RotationOutcome> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let still_valid = state
            .tokens
            .get(consumed)
            .is_some_and(|t| t.is_usable_at(now));
        if !still_valid {
            return Ok(RotationOutcome::Lost);
        }

        // Insert first so a rejected successor leaves the consumed token untouched.
        let inserted = state.insert_token(successor, now)?;
        if let Some(t) = state.tokens.get_mut(consumed) {
            t.revoked = true;
            t.revoked_reason = Some(reason.to_string());
            t.replaced_by_token = Some(successor.token.clone());
            t.updated_at = now;
        }
        Ok(RotationOutcome::Rotated(inserted))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn roles_for(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_session(user_id: Uuid, sid: &str) -> NewSession {
        NewSession {
            session_id: sid.to_string(),
            user_id,
            ip_address: "10.0.0.1".to_string(),
            device_info: "test-agent".to_string(),
            location: "Unknown".to_string(),
            expires_at: Utc::now() + Duration::days(1),
        }
    }

    fn new_token(session_row: Uuid, value: &str) -> NewRefreshToken {
        NewRefreshToken {
            token: value.to_string(),
            session_id: session_row,
            expires_at: Utc::now() + Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_rotate_is_single_use() {
        let store = MemoryStore::new();
        let session = SessionStore::insert(&store, &new_session(Uuid::new_v4(), "s1"))
            .await
            .unwrap();
        RefreshTokenStore::insert(&store, &new_token(session.id, "r1"))
            .await
            .unwrap();

        let first = store
            .rotate("r1", &new_token(session.id, "r2"), "replaced by rotation")
            .await
            .unwrap();
        assert!(first.is_rotated());

        let second = store
            .rotate("r1", &new_token(session.id, "r3"), "replaced by rotation")
            .await
            .unwrap();
        assert!(!second.is_rotated());

        let consumed = store.find_by_token("r1").await.unwrap().unwrap();
        assert!(consumed.revoked);
        assert_eq!(consumed.replaced_by_token.as_deref(), Some("r2"));
        assert!(store.find_by_token("r3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_one_winner() {
        let store = MemoryStore::new();
        let session = SessionStore::insert(&store, &new_session(Uuid::new_v4(), "s1"))
            .await
            .unwrap();
        RefreshTokenStore::insert(&store, &new_token(session.id, "r1"))
            .await
            .unwrap();

        let attempts = (0..8).map(|i| {
            let store = store.clone();
            let successor = new_token(session.id, &format!("next-{i}"));
            async move { store.rotate("r1", &successor, "replaced by rotation").await }
        });
        let results = futures::future::join_all(attempts).await;
        let winners = results
            .into_iter()
            .filter(|r| r.as_ref().is_ok_and(RotationOutcome::is_rotated))
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_rotate_rejects_expired_token() {
        let store = MemoryStore::new();
        let session = SessionStore::insert(&store, &new_session(Uuid::new_v4(), "s1"))
            .await
            .unwrap();
        let stale = NewRefreshToken {
            expires_at: Utc::now() - Duration::seconds(1),
            ..new_token(session.id, "old")
        };
        RefreshTokenStore::insert(&store, &stale).await.unwrap();

        let outcome = store
            .rotate("old", &new_token(session.id, "new"), "replaced by rotation")
            .await
            .unwrap();
        assert!(!outcome.is_rotated());
        assert!(!store.find_by_token("old").await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn test_duplicate_token_is_conflict() {
        let store = MemoryStore::new();
        let session = SessionStore::insert(&store, &new_session(Uuid::new_v4(), "s1"))
            .await
            .unwrap();
        RefreshTokenStore::insert(&store, &new_token(session.id, "dup"))
            .await
            .unwrap();
        let err = RefreshTokenStore::insert(&store, &new_token(session.id, "dup"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, passgate_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_session_revoke_cascades_and_is_conditional() {
        let store = MemoryStore::new();
        let session = SessionStore::insert(&store, &new_session(Uuid::new_v4(), "s1"))
            .await
            .unwrap();
        RefreshTokenStore::insert(&store, &new_token(session.id, "r1"))
            .await
            .unwrap();

        assert!(SessionStore::revoke(&store, "s1", "logout").await.unwrap());
        assert!(!SessionStore::revoke(&store, "s1", "logout").await.unwrap());
        assert!(!SessionStore::revoke(&store, "missing", "logout").await.unwrap());

        let token = store.find_by_token("r1").await.unwrap().unwrap();
        assert!(token.revoked);
        assert_eq!(token.revoked_reason.as_deref(), Some("logout"));
        assert!(store.find_active_by_session_id("s1").await.unwrap().is_none());
        assert!(store.find_by_session_id("s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_all_only_touches_one_user() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for sid in ["a1", "a2"] {
            let s = SessionStore::insert(&store, &new_session(alice, sid))
                .await
                .unwrap();
            RefreshTokenStore::insert(&store, &new_token(s.id, &format!("tok-{sid}")))
                .await
                .unwrap();
        }
        SessionStore::insert(&store, &new_session(bob, "b1"))
            .await
            .unwrap();

        let mut revoked = store.revoke_all_for_user(alice, "admin").await.unwrap();
        revoked.sort();
        assert_eq!(revoked, vec!["a1".to_string(), "a2".to_string()]);
        assert!(store.find_active_by_user(alice).await.unwrap().is_empty());
        assert_eq!(store.find_active_by_user(bob).await.unwrap().len(), 1);
        assert!(store.find_by_token("tok-a1").await.unwrap().unwrap().revoked);

        // second pass finds nothing left to revoke
        assert!(store.revoke_all_for_user(alice, "admin").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_refresh_skips_revoked_session() {
        let store = MemoryStore::new();
        let session = SessionStore::insert(&store, &new_session(Uuid::new_v4(), "s1"))
            .await
            .unwrap();
        let activity = SessionActivity {
            ip_address: "10.0.0.2".to_string(),
            device_info: "phone".to_string(),
            expires_at: Utc::now() + Duration::days(2),
        };
        assert!(store.record_refresh(session.id, &activity).await.unwrap());
        let updated = SessionStore::find_by_id(&store, session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.ip_address, "10.0.0.2");

        SessionStore::revoke(&store, "s1", "logout").await.unwrap();
        assert!(!store.record_refresh(session.id, &activity).await.unwrap());
        assert!(!store.touch("s1").await.unwrap());
    }
}

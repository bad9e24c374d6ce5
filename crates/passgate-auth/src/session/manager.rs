//! Session state machine: login, refresh rotation, logout, and revocation.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use passgate_cache::CacheManager;
use passgate_cache::keys;
use passgate_core::config::session::SessionConfig;
use passgate_core::error::AppError;
use passgate_core::result::AppResult;
use passgate_core::traits::cache::CacheProvider;
use passgate_database::store::{RefreshTokenStore, RotationOutcome, SessionStore};
use passgate_entity::session::{
    NewRefreshToken, NewSession, RefreshToken, Session, SessionActivity, SessionCacheEntry,
    UNKNOWN_LOCATION,
};

use crate::identity::{CredentialCheck, IdentityProvider};
use crate::jwt::{IssuedTokens, TokenCodec};
use crate::validator::{TokenValidation, Validator};

use super::outcome::{AuthError, RevokeOutcome, SessionBundle, reason};

/// Sole writer of session, refresh-token, and session-marker state.
///
/// Built by explicit construction from its collaborators. Every store and
/// cache call is bounded by [`SessionConfig::operation_timeout`]; a call
/// that fails or overruns is logged here and surfaces as
/// [`AuthError::Internal`]. Writes that already committed stay committed.
#[derive(Clone)]
pub struct SessionOrchestrator {
    sessions: Arc<dyn SessionStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    identity: Arc<dyn IdentityProvider>,
    cache: CacheManager,
    codec: Arc<TokenCodec>,
    validator: Validator,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        identity: Arc<dyn IdentityProvider>,
        cache: CacheManager,
        codec: Arc<TokenCodec>,
        config: SessionConfig,
    ) -> Self {
        let validator = Validator::new(codec.clone(), cache.clone(), config.operation_timeout());
        Self {
            sessions,
            refresh_tokens,
            identity,
            cache,
            codec,
            validator,
            config,
        }
    }

    /// The read-only validator sharing this orchestrator's codec and cache.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// The token codec, e.g. for signing-secret rotation.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Performs the login flow:
    ///
    /// 1. Check credentials with the identity provider
    /// 2. Generate a session id and mint a token pair
    /// 3. Insert the session (expiring with the refresh token)
    /// 4. Insert the refresh token
    /// 5. Write the session marker to the cache
    ///
    /// The durable writes and the cache write are not atomic together. A
    /// crash between them leaves a durably active session whose access
    /// tokens are rejected until the next refresh writes the marker.
    pub async fn login(
        &self,
        email: &str,
        secret: &str,
        ip_address: &str,
        device_info: &str,
    ) -> Result<SessionBundle, AuthError> {
        let check = self
            .call(
                "login.authenticate",
                email,
                self.identity.authenticate(email, secret),
            )
            .await?;

        let profile = match check {
            CredentialCheck::Verified(profile) => profile,
            CredentialCheck::InvalidCredentials => {
                debug!("Login rejected: invalid credentials");
                return Err(AuthError::InvalidCredentials);
            }
            CredentialCheck::AccountInactive => {
                info!("Login rejected: account inactive");
                return Err(AuthError::AccountInactive);
            }
        };

        let session_id = Uuid::new_v4().to_string();
        let tokens = self
            .codec
            .issue(profile.id, &session_id)
            .map_err(|e| fault("login.issue", &session_id, &e))?;

        let new_session = NewSession {
            session_id: session_id.clone(),
            user_id: profile.id,
            ip_address: ip_address.to_string(),
            device_info: device_info.to_string(),
            location: UNKNOWN_LOCATION.to_string(),
            expires_at: tokens.refresh_expires_at,
        };
        let session = self
            .call(
                "login.insert_session",
                &session_id,
                self.sessions.insert(&new_session),
            )
            .await?;

        let new_token = NewRefreshToken {
            token: tokens.refresh_token.clone(),
            session_id: session.id,
            expires_at: tokens.refresh_expires_at,
        };
        self.call(
            "login.insert_refresh_token",
            &session_id,
            self.refresh_tokens.insert(&new_token),
        )
        .await?;

        self.publish("login.publish", &session, &tokens).await?;

        info!(user_id = %profile.id, session_id = %session_id, "Login successful");
        Ok(SessionBundle::new(profile, &session_id, tokens))
    }

    /// Exchanges a refresh token for a new pair:
    ///
    /// 1. Look up the token; it must exist, be unrevoked, and be unexpired
    /// 2. Load its session; if revoked or expired, revoke the token
    /// 3. Load the user; if gone or inactive, revoke the token
    /// 4. Mint a new pair and atomically swap the consumed token for it
    /// 5. Record the activity on the session
    /// 6. Rewrite the session marker
    ///
    /// A token is consumed at most once. When two callers race with the same
    /// token, the store lets exactly one swap succeed and the other gets
    /// [`AuthError::TokenInvalidOrExpired`].
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ip_address: &str,
        device_info: &str,
    ) -> Result<SessionBundle, AuthError> {
        let now = Utc::now();

        let stored = self
            .call(
                "refresh.find_token",
                "-",
                self.refresh_tokens.find_by_token(refresh_token),
            )
            .await?;
        let Some(stored) = stored else {
            debug!("Refresh rejected: unknown token");
            return Err(AuthError::TokenInvalidOrExpired);
        };

        if stored.revoked {
            if stored.was_rotated() {
                self.on_reuse(&stored).await?;
            }
            debug!(token_id = %stored.id, "Refresh rejected: token revoked");
            return Err(AuthError::TokenInvalidOrExpired);
        }
        if stored.is_expired_at(now) {
            debug!(token_id = %stored.id, "Refresh rejected: token expired");
            return Err(AuthError::TokenInvalidOrExpired);
        }

        let session = self
            .call(
                "refresh.find_session",
                "-",
                self.sessions.find_by_id(stored.session_id),
            )
            .await?;
        let session = match session {
            Some(session) if session.is_active_at(now) => session,
            other => {
                let sid = other.map(|s| s.session_id).unwrap_or_default();
                self.call(
                    "refresh.revoke_token",
                    &sid,
                    self.refresh_tokens
                        .revoke(refresh_token, reason::SESSION_INVALID),
                )
                .await?;
                info!(token_id = %stored.id, session_id = %sid, "Refresh rejected: session invalid");
                return Err(AuthError::SessionInvalid);
            }
        };
        let sid = session.session_id.as_str();

        let profile = self
            .call(
                "refresh.find_user",
                sid,
                self.identity.find_user(session.user_id),
            )
            .await?;
        let profile = match profile {
            Some(profile) if profile.is_active => profile,
            _ => {
                self.call(
                    "refresh.revoke_token",
                    sid,
                    self.refresh_tokens
                        .revoke(refresh_token, reason::USER_INVALID),
                )
                .await?;
                info!(user_id = %session.user_id, session_id = %sid, "Refresh rejected: user invalid");
                return Err(AuthError::UserInvalid);
            }
        };

        let tokens = self
            .codec
            .issue(profile.id, sid)
            .map_err(|e| fault("refresh.issue", sid, &e))?;

        let successor = NewRefreshToken {
            token: tokens.refresh_token.clone(),
            session_id: session.id,
            expires_at: tokens.refresh_expires_at,
        };
        let rotation = self
            .call(
                "refresh.rotate",
                sid,
                self.refresh_tokens
                    .rotate(refresh_token, &successor, reason::ROTATED),
            )
            .await?;
        if let RotationOutcome::Lost = rotation {
            debug!(session_id = %sid, "Refresh rejected: token consumed concurrently");
            return Err(AuthError::TokenInvalidOrExpired);
        }

        let activity = SessionActivity {
            ip_address: ip_address.to_string(),
            device_info: device_info.to_string(),
            expires_at: tokens.refresh_expires_at,
        };
        let recorded = self
            .call(
                "refresh.record_activity",
                sid,
                self.sessions.record_refresh(session.id, &activity),
            )
            .await?;
        if !recorded {
            // The successor may have committed after the session's token
            // cascade ran, so it is not covered by it.
            self.call(
                "refresh.revoke_successor",
                sid,
                self.refresh_tokens
                    .revoke(&tokens.refresh_token, reason::SESSION_INVALID),
            )
            .await?;
            info!(session_id = %sid, "Refresh rejected: session revoked during rotation");
            return Err(AuthError::SessionInvalid);
        }

        self.publish("refresh.publish", &session, &tokens).await?;

        info!(user_id = %profile.id, session_id = %sid, "Session refreshed");
        Ok(SessionBundle::new(profile, sid, tokens))
    }

    /// Ends a session. Revokes it together with its refresh tokens and
    /// removes its marker. Logging out a session that is already revoked or
    /// unknown succeeds and changes nothing.
    pub async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        let revoked = self
            .call(
                "logout.revoke",
                session_id,
                self.sessions.revoke(session_id, reason::LOGOUT),
            )
            .await?;
        self.evict("logout.evict", session_id).await?;

        if revoked {
            info!(session_id = %session_id, "Session logged out");
        } else {
            debug!(session_id = %session_id, "Logout on inactive or unknown session");
        }
        Ok(())
    }

    /// Administratively revokes one session with its refresh tokens and
    /// removes its marker.
    pub async fn revoke_session(
        &self,
        session_id: &str,
        why: &str,
    ) -> Result<RevokeOutcome, AuthError> {
        let existing = self
            .call(
                "revoke_session.find",
                session_id,
                self.sessions.find_by_session_id(session_id),
            )
            .await?;
        if existing.is_none() {
            debug!(session_id = %session_id, "Revoke requested for unknown session");
            return Ok(RevokeOutcome::NotFound);
        }

        let revoked = self
            .call(
                "revoke_session.revoke",
                session_id,
                self.sessions.revoke(session_id, why),
            )
            .await?;
        self.evict("revoke_session.evict", session_id).await?;

        if revoked {
            info!(session_id = %session_id, reason = %why, "Session revoked");
            Ok(RevokeOutcome::Revoked)
        } else {
            Ok(RevokeOutcome::AlreadyRevoked)
        }
    }

    /// Revokes every session of a user and removes their markers. Returns
    /// how many sessions this call revoked.
    ///
    /// The durable revoke runs first and reports exactly which sessions it
    /// moved, so a session created by a concurrent login before the revoke
    /// committed is evicted too.
    pub async fn revoke_all_user_sessions(
        &self,
        user_id: Uuid,
        why: &str,
    ) -> Result<usize, AuthError> {
        let subject = user_id.to_string();
        let revoked = self
            .call(
                "revoke_all.revoke",
                &subject,
                self.sessions.revoke_all_for_user(user_id, why),
            )
            .await?;

        let mut outcome = Ok(revoked.len());
        for session_id in &revoked {
            // keep evicting the rest even if one delete fails
            if let Err(e) = self.evict("revoke_all.evict", session_id).await {
                outcome = Err(e);
            }
        }

        info!(user_id = %user_id, count = revoked.len(), reason = %why, "Revoked all user sessions");
        outcome
    }

    /// Checks an access token on the per-request fast path.
    pub async fn validate_access_token(&self, token: &str) -> TokenValidation {
        self.validator.is_usable(token).await
    }

    /// Records activity on an active session without touching tokens or
    /// the cache. Returns `false` if no active session matched.
    pub async fn touch_session(&self, session_id: &str) -> Result<bool, AuthError> {
        self.call("touch", session_id, self.sessions.touch(session_id))
            .await
    }

    /// Lists the active sessions of a user, newest first.
    pub async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        self.call(
            "active_sessions",
            &user_id.to_string(),
            self.sessions.find_active_by_user(user_id),
        )
        .await
    }

    /// Writes the session marker, then re-reads the session. If a revoke
    /// committed in between, the marker and the new refresh token are
    /// withdrawn so a concurrent logout always wins.
    async fn publish(
        &self,
        operation: &'static str,
        session: &Session,
        tokens: &IssuedTokens,
    ) -> Result<(), AuthError> {
        let sid = session.session_id.as_str();
        let key = keys::session_entry(sid);
        let entry = SessionCacheEntry::active(session.user_id, sid);
        let remaining = (tokens.access_expires_at - Utc::now())
            .to_std()
            .unwrap_or_default();

        self.call(
            operation,
            sid,
            self.cache
                .set_json(&key, &entry, keys::session_ttl(remaining)),
        )
        .await?;

        let current = self
            .call(operation, sid, self.sessions.find_by_id(session.id))
            .await?;
        if current.is_some_and(|s| s.is_active()) {
            return Ok(());
        }

        self.evict(operation, sid).await?;
        self.call(
            operation,
            sid,
            self.refresh_tokens
                .revoke(&tokens.refresh_token, reason::SESSION_INVALID),
        )
        .await?;
        info!(session_id = %sid, "Session revoked while its tokens were being issued");
        Err(AuthError::SessionInvalid)
    }

    async fn evict(&self, operation: &'static str, session_id: &str) -> Result<(), AuthError> {
        self.call(
            operation,
            session_id,
            self.cache.delete(&keys::session_entry(session_id)),
        )
        .await
    }

    /// A token that was already rotated away has been presented again.
    async fn on_reuse(&self, stored: &RefreshToken) -> Result<(), AuthError> {
        warn!(
            token_id = %stored.id,
            session_row = %stored.session_id,
            "Rotated refresh token presented again"
        );
        if !self.config.revoke_on_refresh_reuse {
            return Ok(());
        }

        let session = self
            .call(
                "refresh.reuse_lookup",
                "-",
                self.sessions.find_by_id(stored.session_id),
            )
            .await?;
        if let Some(session) = session {
            let sid = session.session_id.as_str();
            let revoked = self
                .call(
                    "refresh.reuse_revoke",
                    sid,
                    self.sessions.revoke(sid, reason::REFRESH_REUSE),
                )
                .await?;
            self.evict("refresh.reuse_evict", sid).await?;
            if revoked {
                warn!(session_id = %sid, "Session revoked after refresh token reuse");
            }
        }
        Ok(())
    }

    /// Runs one collaborator call under the configured bound.
    async fn call<T>(
        &self,
        operation: &'static str,
        subject: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.config.operation_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(fault(operation, subject, &e)),
            Err(_) => {
                let e = AppError::timeout(format!(
                    "{operation} did not complete within {}ms",
                    self.config.operation_timeout_ms
                ));
                Err(fault(operation, subject, &e))
            }
        }
    }
}

/// The one place an infrastructure fault becomes [`AuthError::Internal`].
fn fault(operation: &str, subject: &str, err: &AppError) -> AuthError {
    error!(
        operation,
        subject,
        kind = %err.kind,
        transient = err.kind.is_transient(),
        error = %err,
        source = ?err.source,
        "Session operation failed"
    );
    AuthError::Internal
}

//! Caller-facing results of session operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use passgate_entity::user::UserProfile;

use crate::jwt::IssuedTokens;

/// Revocation reasons recorded on sessions and refresh tokens.
pub mod reason {
    /// The user logged out.
    pub const LOGOUT: &str = "logout";
    /// Consumed by a successful refresh.
    pub const ROTATED: &str = "replaced by rotation";
    /// Presented for a session that is revoked or expired.
    pub const SESSION_INVALID: &str = "session invalid";
    /// Presented for an account that is gone or deactivated.
    pub const USER_INVALID: &str = "user invalid";
    /// An already-rotated token was presented again.
    pub const REFRESH_REUSE: &str = "refresh token reuse";
}

/// Failure taxonomy of the session layer.
///
/// Every variant except [`AuthError::Internal`] is an expected business
/// outcome. `Internal` deliberately carries no detail; the cause is logged
/// where it is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown email or wrong secret.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// Correct secret for a deactivated account.
    #[error("account is inactive")]
    AccountInactive,
    /// Refresh token unknown, revoked, or past expiry.
    #[error("refresh token is invalid or expired")]
    TokenInvalidOrExpired,
    /// The session behind a refresh token is revoked or expired.
    #[error("session is no longer valid")]
    SessionInvalid,
    /// The account behind a session is gone or deactivated.
    #[error("user is no longer valid")]
    UserInvalid,
    /// An unexpected collaborator fault.
    #[error("internal error")]
    Internal,
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::TokenInvalidOrExpired => "TOKEN_INVALID_OR_EXPIRED",
            Self::SessionInvalid => "SESSION_INVALID",
            Self::UserInvalid => "USER_INVALID",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether this is an unexpected fault rather than a business outcome.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Result of an administrative single-session revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeOutcome {
    /// This call revoked the session.
    Revoked,
    /// The session exists but was already revoked.
    AlreadyRevoked,
    /// No session has that identifier.
    NotFound,
}

/// Everything a client receives after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBundle {
    /// Account identifier.
    pub user_id: Uuid,
    /// Public session identifier.
    pub session_id: String,
    /// Email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Opaque role labels.
    pub roles: Vec<String>,
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Access-token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh-token expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

impl SessionBundle {
    pub(crate) fn new(profile: UserProfile, session_id: &str, tokens: IssuedTokens) -> Self {
        Self {
            user_id: profile.id,
            session_id: session_id.to_string(),
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            roles: profile.roles,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

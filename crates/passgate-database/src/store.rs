//! Store contracts consumed by the session layer.
//!
//! Each trait exposes only the operations the session lifecycle needs.
//! Every state transition is conditional ("revoke iff not yet revoked")
//! and reports whether this caller performed it, so concurrent callers can
//! never both believe they won.

use async_trait::async_trait;
use uuid::Uuid;

use passgate_core::result::AppResult;
use passgate_entity::session::{
    NewRefreshToken, NewSession, RefreshToken, Session, SessionActivity,
};
use passgate_entity::user::User;

/// Result of an atomic refresh-token rotation.
#[derive(Debug, Clone)]
pub enum RotationOutcome {
    /// The consumed token was still valid; it is now revoked and the
    /// successor has been inserted.
    Rotated(RefreshToken),
    /// The consumed token was already revoked or expired when the update
    /// ran. Nothing was written.
    Lost,
}

impl RotationOutcome {
    /// Whether this caller won the rotation.
    pub fn is_rotated(&self) -> bool {
        matches!(self, Self::Rotated(_))
    }
}

/// Durable session records.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Insert a new active session.
    async fn insert(&self, new: &NewSession) -> AppResult<Session>;

    /// Find a session by its storage key, in any state.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Find a session by its public identifier, in any state.
    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>>;

    /// Find a session by its public identifier if it is neither revoked nor
    /// expired.
    async fn find_active_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>>;

    /// All active sessions of a user, newest first.
    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Apply the activity of a successful refresh. Returns `false` if the
    /// session was revoked in the meantime, in which case nothing changes.
    async fn record_refresh(&self, id: Uuid, activity: &SessionActivity) -> AppResult<bool>;

    /// Bump `last_active` on an active session. Returns `false` if no active
    /// session matched.
    async fn touch(&self, session_id: &str) -> AppResult<bool>;

    /// Revoke a session iff it is not yet revoked. Any unrevoked refresh
    /// tokens of the session are revoked in the same transaction. Returns
    /// whether this call moved the session to revoked.
    async fn revoke(&self, session_id: &str, reason: &str) -> AppResult<bool>;

    /// Revoke every unrevoked session of a user together with their refresh
    /// tokens in one transaction. Returns the public identifiers of the
    /// sessions this call revoked.
    async fn revoke_all_for_user(&self, user_id: Uuid, reason: &str) -> AppResult<Vec<String>>;
}

/// Durable refresh-token records.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Insert a new token. Fails with a conflict on a duplicate value.
    async fn insert(&self, new: &NewRefreshToken) -> AppResult<RefreshToken>;

    /// Find a token by value, in any state.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshToken>>;

    /// The newest unrevoked, unexpired token of a session.
    async fn find_active_by_session(&self, session_row: Uuid) -> AppResult<Option<RefreshToken>>;

    /// Revoke a token iff it is not yet revoked. Returns whether this call
    /// performed the transition.
    async fn revoke(&self, token: &str, reason: &str) -> AppResult<bool>;

    /// Revoke `consumed` iff it is still unrevoked and unexpired, point its
    /// `replaced_by_token` at the successor, and insert the successor, all in
    /// one atomic step.
    async fn rotate(
        &self,
        consumed: &str,
        successor: &NewRefreshToken,
        reason: &str,
    ) -> AppResult<RotationOutcome>;
}

/// Read access to accounts.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Role labels assigned to a user.
    async fn roles_for(&self, user_id: Uuid) -> AppResult<Vec<String>>;
}

//! Refresh token entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A long-lived opaque credential bound to one session.
///
/// A token is consumed at most once: rotation revokes it and records the
/// value of its successor in `replaced_by_token`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    /// Storage key.
    pub id: Uuid,
    /// The opaque token value (unique).
    #[serde(skip_serializing)]
    pub token: String,
    /// Storage key of the owning session.
    pub session_id: Uuid,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Whether the token has been revoked.
    pub revoked: bool,
    /// Why the token was revoked.
    pub revoked_reason: Option<String>,
    /// Value of the token that superseded this one on rotation.
    #[serde(skip_serializing)]
    pub replaced_by_token: Option<String>,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Check whether the token has expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check whether the token may still be exchanged.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Check whether the token was consumed by rotation.
    pub fn was_rotated(&self) -> bool {
        self.revoked && self.replaced_by_token.is_some()
    }
}

/// Data required to insert a refresh token.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    /// The opaque token value.
    pub token: String,
    /// Storage key of the owning session.
    pub session_id: Uuid,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Placeholder stored in [`Session::location`] until a geolocation lookup
/// fills it in.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// The durable record of one authenticated device or browser instance.
///
/// Exactly one session is created per login. Rows are never deleted; a
/// session ends by being revoked or by passing `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Storage key.
    pub id: Uuid,
    /// Opaque public identifier carried in access-token claims.
    pub session_id: String,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// Client address at login or last refresh.
    pub ip_address: String,
    /// Free-form device description.
    pub device_info: String,
    /// Coarse client location.
    pub location: String,
    /// Last login, refresh, or touch.
    pub last_active: DateTime<Utc>,
    /// Follows the expiry of the newest refresh token.
    pub expires_at: DateTime<Utc>,
    /// Whether the session has been revoked.
    pub revoked: bool,
    /// Why the session was revoked.
    pub revoked_reason: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check whether the session is usable (not revoked and not expired).
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Activity check against an explicit clock reading.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }
}

/// Data required to create a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    /// Public session identifier.
    pub session_id: String,
    /// Owning user.
    pub user_id: Uuid,
    /// Client address.
    pub ip_address: String,
    /// Device description.
    pub device_info: String,
    /// Coarse location.
    pub location: String,
    /// Equal to the refresh-token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Fields rewritten on a successful refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionActivity {
    /// Client address presented with the refresh.
    pub ip_address: String,
    /// Device description presented with the refresh.
    pub device_info: String,
    /// New expiry, equal to the successor refresh token's.
    pub expires_at: DateTime<Utc>,
}

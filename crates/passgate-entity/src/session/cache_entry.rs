//! Fast-path cache value for a live session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value stored under a session's cache key.
///
/// Presence of the key is what the validator checks; the payload is kept
/// for diagnostics and for callers that want the owning user without a
/// database round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCacheEntry {
    /// Owning user.
    pub user_id: Uuid,
    /// Public session identifier.
    pub session_id: String,
    /// Always `true` for a written entry.
    pub active: bool,
}

impl SessionCacheEntry {
    /// Build the entry written for an active session.
    pub fn active(user_id: Uuid, session_id: impl Into<String>) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
            active: true,
        }
    }
}

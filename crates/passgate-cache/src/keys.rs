//! Cache key builders for every Passgate cache entry.
//!
//! Providers add their own configured prefix; these functions only build
//! the logical part of the key.

use std::time::Duration;

/// Namespace for live-session markers.
const SESSION: &str = "session";

/// Shortest TTL ever written for a session marker.
pub const MIN_SESSION_TTL: Duration = Duration::from_secs(1);

// ── Session keys ───────────────────────────────────────────

/// Cache key whose presence marks a session as live.
pub fn session_entry(session_id: &str) -> String {
    format!("{SESSION}:{session_id}")
}

/// TTL for a session marker written now for an access token valid for
/// `remaining`.
pub fn session_ttl(remaining: Duration) -> Duration {
    remaining.max(MIN_SESSION_TTL)
}

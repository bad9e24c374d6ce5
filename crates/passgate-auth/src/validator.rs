//! Per-request access-token check.
//!
//! A token is usable only if its signature and expiry verify *and* the
//! session's cache marker still exists. The durable store is never read
//! here; deleting the marker is what makes logout and revocation take
//! effect before the token's own expiry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use passgate_cache::CacheManager;
use passgate_cache::keys;
use passgate_core::traits::cache::CacheProvider;

use crate::jwt::{AccessClaims, TokenCodec, TokenError};

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Unparseable or missing required claims.
    Malformed,
    /// Signed with a different key.
    InvalidSignature,
    /// Past its expiry.
    Expired,
    /// No session identifier in the claims.
    MissingSession,
    /// The session marker is gone: logged out, revoked, or lapsed.
    SessionRevoked,
}

impl From<TokenError> for RejectReason {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => Self::Malformed,
            TokenError::InvalidSignature => Self::InvalidSignature,
            TokenError::Expired => Self::Expired,
        }
    }
}

/// Answer to "is this access token currently usable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidation {
    /// Signature, expiry, and session marker all check out.
    Usable(AccessClaims),
    /// The token must not be honoured.
    Rejected(RejectReason),
    /// The signature verified but the cache could not be consulted. The
    /// caller decides the policy; the validator has no opinion.
    Unconfirmed,
}

impl TokenValidation {
    /// Claims of a usable token.
    pub fn claims(&self) -> Option<&AccessClaims> {
        match self {
            Self::Usable(claims) => Some(claims),
            _ => None,
        }
    }

    /// Whether the token is usable.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Usable(_))
    }
}

/// Read-only access-token validator.
#[derive(Debug, Clone)]
pub struct Validator {
    codec: Arc<TokenCodec>,
    cache: CacheManager,
    cache_timeout: Duration,
}

impl Validator {
    /// Creates a validator. `cache_timeout` bounds each cache lookup.
    pub fn new(codec: Arc<TokenCodec>, cache: CacheManager, cache_timeout: Duration) -> Self {
        Self {
            codec,
            cache,
            cache_timeout,
        }
    }

    /// Decides whether an access token may be honoured right now.
    pub async fn is_usable(&self, token: &str) -> TokenValidation {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(reason = %e, "Access token rejected");
                return TokenValidation::Rejected(e.into());
            }
        };

        if claims.sid.is_empty() {
            debug!(user_id = %claims.sub, "Access token has no session id");
            return TokenValidation::Rejected(RejectReason::MissingSession);
        }

        match self.marker_exists(&claims.sid).await {
            Some(true) => TokenValidation::Usable(claims),
            Some(false) => {
                debug!(session_id = %claims.sid, "Access token rejected: session not live");
                TokenValidation::Rejected(RejectReason::SessionRevoked)
            }
            None => TokenValidation::Unconfirmed,
        }
    }

    /// Whether a session should be treated as revoked. A cache failure
    /// counts as revoked.
    pub async fn is_session_revoked(&self, session_id: &str) -> bool {
        !matches!(self.marker_exists(session_id).await, Some(true))
    }

    /// `None` when the cache errored or timed out.
    async fn marker_exists(&self, session_id: &str) -> Option<bool> {
        let key = keys::session_entry(session_id);
        match tokio::time::timeout(self.cache_timeout, self.cache.exists(&key)).await {
            Ok(Ok(exists)) => Some(exists),
            Ok(Err(e)) => {
                warn!(session_id = %session_id, error = %e, "Session marker lookup failed");
                None
            }
            Err(_) => {
                warn!(
                    session_id = %session_id,
                    timeout_ms = self.cache_timeout.as_millis() as u64,
                    "Session marker lookup timed out"
                );
                None
            }
        }
    }
}

//! Stateless token minting and verification.
//!
//! The codec signs access tokens with a shared HMAC secret and draws opaque
//! refresh-token values from the operating system's CSPRNG. It performs no
//! I/O; persisting and caching what it mints is the orchestrator's job.

use std::sync::{PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use passgate_core::config::auth::{AuthConfig, MIN_REFRESH_TOKEN_BYTES};
use passgate_core::error::{AppError, ErrorKind};
use passgate_core::result::AppResult;

use super::claims::AccessClaims;

/// Why an access token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token could not be parsed or is missing required claims.
    #[error("token is malformed")]
    Malformed,
    /// The signature does not match the current signing key.
    #[error("token signature is invalid")]
    InvalidSignature,
    /// The token is past its expiry.
    #[error("token has expired")]
    Expired,
}

/// A freshly minted credential pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh-token value.
    pub refresh_token: String,
    /// When the access token expires.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token expires.
    pub refresh_expires_at: DateTime<Utc>,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Only the claim needed for diagnostics; everything else is ignored.
#[derive(Deserialize)]
struct PeekedClaims {
    sid: Option<String>,
}

/// Mints and verifies access tokens and generates refresh-token values.
pub struct TokenCodec {
    keys: RwLock<SigningKeys>,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    refresh_bytes: usize,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("refresh_bytes", &self.refresh_bytes)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Creates a codec from auth configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let to_chrono = |d: std::time::Duration| {
            Duration::from_std(d).map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Token lifetime out of range", e)
            })
        };

        Ok(Self {
            keys: RwLock::new(SigningKeys::from_secret(&config.jwt_secret)),
            validation,
            access_ttl: to_chrono(config.access_ttl())?,
            refresh_ttl: to_chrono(config.refresh_ttl())?,
            refresh_bytes: config.refresh_token_bytes.max(MIN_REFRESH_TOKEN_BYTES),
        })
    }

    /// Access-token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Mints an access token and a refresh-token value for a session.
    pub fn issue(&self, user_id: Uuid, session_id: &str) -> AppResult<IssuedTokens> {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = iat + self.access_ttl.num_seconds();
        let claims = AccessClaims {
            sub: user_id,
            sid: session_id.to_string(),
            iat,
            exp,
            jti: Uuid::new_v4(),
        };

        let access_token = {
            let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
            encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to sign access token", e)
            })?
        };

        Ok(IssuedTokens {
            access_token,
            refresh_token: self.generate_refresh_token(),
            access_expires_at: claims.expires_at(),
            refresh_expires_at: now + self.refresh_ttl,
        })
    }

    /// Verifies signature and expiry of an access token. Pure; no I/O.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        decode::<AccessClaims>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }

    /// Reads the session identifier without checking the signature.
    ///
    /// For diagnostics and log correlation only; never authorize on it.
    pub fn peek_session_id(&self, token: &str) -> Option<String> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice::<PeekedClaims>(&bytes).ok()?.sid
    }

    /// Replaces the signing secret. Every token signed with the previous
    /// secret fails verification from this point on.
    pub fn rotate_secret(&self, secret: &str) -> AppResult<()> {
        if secret.is_empty() {
            return Err(AppError::configuration("Signing secret must not be empty"));
        }
        let fresh = SigningKeys::from_secret(secret);
        *self.keys.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        info!("Access-token signing secret rotated");
        Ok(())
    }

    /// Draws a new opaque refresh-token value.
    pub fn generate_refresh_token(&self) -> String {
        let mut bytes = vec![0u8; self.refresh_bytes];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

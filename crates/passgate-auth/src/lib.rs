//! # passgate-auth
//!
//! Credential lifecycle for Passgate.
//!
//! ## Modules
//!
//! - `jwt`: access-token signing/verification and refresh-token generation
//! - `validator`: the per-request "is this access token usable" check
//! - `session`: the session state machine (login, refresh, logout, revoke)
//! - `identity`: credential checks against the user store
//! - `password`: Argon2id password hashing

pub mod identity;
pub mod jwt;
pub mod password;
pub mod session;
pub mod validator;

pub use identity::{CredentialCheck, IdentityProvider, PasswordIdentityProvider};
pub use jwt::{AccessClaims, IssuedTokens, TokenCodec, TokenError};
pub use password::PasswordHasher;
pub use session::{AuthError, RevokeOutcome, SessionBundle, SessionOrchestrator};
pub use validator::{RejectReason, TokenValidation, Validator};

//! Session lifecycle: login, rotation on refresh, logout, and revocation.

pub mod manager;
pub mod outcome;

pub use manager::SessionOrchestrator;
pub use outcome::{AuthError, RevokeOutcome, SessionBundle, reason};

//! PostgreSQL implementations of the store traits.

pub mod refresh_token;
pub mod session;
pub mod user;

pub use refresh_token::RefreshTokenRepository;
pub use session::SessionRepository;
pub use user::UserRepository;

use passgate_core::error::{AppError, ErrorKind};

/// Map a sqlx error, turning unique-constraint violations into conflicts.
pub(crate) fn map_write_err(e: sqlx::Error, message: &str) -> AppError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::with_source(ErrorKind::Conflict, format!("{message}: duplicate value"), e)
    } else {
        AppError::with_source(ErrorKind::Database, message.to_string(), e)
    }
}

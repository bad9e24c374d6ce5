//! Convenience result type alias for Passgate.

use crate::error::AppError;

/// A specialized `Result` type for Passgate infrastructure operations.
pub type AppResult<T> = Result<T, AppError>;

//! # passgate-core
//!
//! Core crate for Passgate. Contains configuration schemas, the cache
//! provider abstraction, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Passgate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;

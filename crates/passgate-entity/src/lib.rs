//! # passgate-entity
//!
//! Plain data records for Passgate. Every struct in this crate represents
//! a database table row or a value object exchanged between the stores and
//! the session layer. Database records additionally derive `sqlx::FromRow`.

pub mod session;
pub mod user;

//! # passgate-database
//!
//! Durable storage for Passgate: narrow per-entity store traits, their
//! PostgreSQL implementations, an in-memory implementation for single-node
//! deployments and tests, and connection/migration management.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{RefreshTokenStore, RotationOutcome, SessionStore, UserStore};

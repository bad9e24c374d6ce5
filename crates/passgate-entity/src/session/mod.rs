//! Session domain records.

pub mod cache_entry;
pub mod model;
pub mod refresh_token;

pub use cache_entry::SessionCacheEntry;
pub use model::{NewSession, Session, SessionActivity, UNKNOWN_LOCATION};
pub use refresh_token::{NewRefreshToken, RefreshToken};

//! User domain records.

pub mod model;

pub use model::{User, UserProfile};

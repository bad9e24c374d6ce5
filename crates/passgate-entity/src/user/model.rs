//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Login email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// Administrative activation flag.
    pub is_active: bool,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if the account may hold sessions.
    pub fn can_login(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    /// Build the public profile carried in a session bundle.
    pub fn profile(&self, roles: Vec<String>) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            roles,
            is_active: self.can_login(),
        }
    }
}

/// Identity returned by a credential check.
///
/// Roles are opaque labels passed through to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User identifier.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Role labels.
    pub roles: Vec<String>,
    /// Whether the account may hold sessions.
    pub is_active: bool,
}

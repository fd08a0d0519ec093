//! User models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    /// Unique login name
    pub username: String,
    /// Unique contact address
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::nil(),
            username: username.into(),
            email: email.into(),
            created_at: None,
        }
    }
}

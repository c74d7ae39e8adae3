use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain model representing a user of the habit tracker.
/// Users are identified by name at the login boundary; the id is the
/// stable handle the rest of the system uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Generate a unique ID for a user
    pub fn generate_id(timestamp_millis: u64) -> String {
        format!("user::{}", timestamp_millis)
    }
}

/// Represents the logged-in user, which could be None when nobody is
/// logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveUser {
    pub user: Option<User>,
}

//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow
//! different storage backends to be used interchangeably in the domain
//! layer.

use anyhow::Result;

use crate::domain::models::habit::Habit as DomainHabit;
use crate::domain::models::user::User as DomainUser;

/// Trait defining the interface for user storage operations
///
/// Note: All operations are synchronous for the desktop backend.
pub trait UserStorage: Send + Sync {
    /// Store a new user
    fn store_user(&self, user: &DomainUser) -> Result<()>;

    /// Retrieve a specific user by ID
    fn get_user(&self, user_id: &str) -> Result<Option<DomainUser>>;

    /// Find a user by their display name (exact match)
    fn find_user_by_name(&self, name: &str) -> Result<Option<DomainUser>>;

    /// List all users ordered by name
    fn list_users(&self) -> Result<Vec<DomainUser>>;

    /// Delete a user and all of their data
    fn delete_user(&self, user_id: &str) -> Result<()>;

    /// Get the currently active (logged-in) user ID
    fn get_active_user(&self) -> Result<Option<String>>;

    /// Set the currently active user
    fn set_active_user(&self, user_id: &str) -> Result<()>;

    /// Clear the active-user pointer (logout)
    fn clear_active_user(&self) -> Result<()>;
}

/// Trait defining the interface for habit storage operations
///
/// This trait abstracts away the specific storage implementation
/// details, allowing the domain layer to work with different storage
/// backends without modification. The only write access the domain
/// needs for logs is "toggle presence of one key".
pub trait HabitStorage: Send + Sync {
    /// Store a new habit for a user
    fn store_habit(&self, user_id: &str, habit: &DomainHabit) -> Result<()>;

    /// Retrieve a specific habit by ID
    fn get_habit(&self, user_id: &str, habit_id: &str) -> Result<Option<DomainHabit>>;

    /// List all habits for a user in creation order
    fn list_habits(&self, user_id: &str) -> Result<Vec<DomainHabit>>;

    /// Update an existing habit's metadata
    fn update_habit(&self, user_id: &str, habit: &DomainHabit) -> Result<()>;

    /// Delete a habit and all of its log entries
    /// Returns true if the habit was found and deleted, false otherwise
    fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<bool>;

    /// Toggle the presence of one period key in a habit's logs
    /// Returns the new state: true if the key is now present
    fn toggle_log(&self, user_id: &str, habit_id: &str, period_key: &str) -> Result<bool>;

    /// Replace the user's entire habit collection (backup restore)
    fn replace_habits(&self, user_id: &str, habits: &[DomainHabit]) -> Result<()>;
}

/// Handle to an object stored on a remote drive.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFileHandle {
    pub id: String,
    pub name: String,
}

/// Trait defining the interface to the remote backup drive
///
/// The drive is an opaque named-object store: the domain only needs to
/// locate a single named object, create or overwrite it, and fetch it
/// back. Nothing here depends on the provider's wire protocol.
pub trait RemoteDrive: Send + Sync {
    /// Find a remote file by exact name
    fn find_file(&self, name: &str) -> Result<Option<RemoteFileHandle>>;

    /// Upload content under the given name, overwriting `existing`
    /// when provided, creating a new object otherwise
    fn upload_file(
        &self,
        name: &str,
        content: &[u8],
        existing: Option<&RemoteFileHandle>,
    ) -> Result<RemoteFileHandle>;

    /// Download a remote file's content
    fn download_file(&self, handle: &RemoteFileHandle) -> Result<Vec<u8>>;
}

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::domain::commands::users::{
    DeleteUserCommand, DeleteUserResult, GetActiveUserResult, ListUsersResult, LoginCommand,
    LoginResult, LogoutResult,
};
use crate::domain::models::user::{ActiveUser, User as DomainUser};
use crate::storage::files::{FileConnection, UserRepository};
use crate::storage::traits::UserStorage;

/// Service for managing users and the login session.
///
/// Login is by plain username: the first login with a new name creates
/// the user, subsequent logins reattach to it. The logged-in user is
/// recorded in the global config so it survives restarts.
#[derive(Clone)]
pub struct UserService {
    user_repository: UserRepository,
}

impl UserService {
    /// Create a new UserService
    pub fn new(connection: Arc<FileConnection>) -> Self {
        let user_repository = UserRepository::new(connection);
        Self { user_repository }
    }

    /// Log in by username, creating the user on first login
    pub fn login(&self, command: LoginCommand) -> Result<LoginResult> {
        let username = command.username.trim();
        info!("Logging in user: {}", username);

        self.validate_username(username)?;

        if let Some(user) = self.user_repository.find_user_by_name(username)? {
            self.user_repository.set_active_user(&user.id)?;
            info!("Logged in existing user: {} ({})", user.name, user.id);
            return Ok(LoginResult {
                user,
                created: false,
            });
        }

        let now = Utc::now();
        // Bump the timestamp when two users are created in the same millisecond.
        let existing = self.user_repository.list_users()?;
        let mut millis = now.timestamp_millis() as u64;
        while existing
            .iter()
            .any(|u| u.id == DomainUser::generate_id(millis))
        {
            millis += 1;
        }

        let user = DomainUser {
            id: DomainUser::generate_id(millis),
            name: username.to_string(),
            created_at: now,
        };

        self.user_repository.store_user(&user)?;
        self.user_repository.set_active_user(&user.id)?;

        info!("Created and logged in new user: {} ({})", user.name, user.id);

        Ok(LoginResult {
            user,
            created: true,
        })
    }

    /// Log out the current user
    pub fn logout(&self) -> Result<LogoutResult> {
        info!("Logging out");
        self.user_repository.clear_active_user()?;
        Ok(LogoutResult {
            success_message: "Logged out".to_string(),
        })
    }

    /// Get the currently logged-in user
    pub fn get_active_user(&self) -> Result<GetActiveUserResult> {
        debug!("Getting active user");

        let active_user_id = self.user_repository.get_active_user()?;

        let active_user_model = if let Some(user_id) = active_user_id {
            match self.user_repository.get_user(&user_id)? {
                Some(user) => {
                    debug!("Found active user: {}", user_id);
                    Some(user)
                }
                None => {
                    warn!("Active user ID exists but user not found: {}", user_id);
                    None
                }
            }
        } else {
            debug!("No active user set");
            None
        };

        Ok(GetActiveUserResult {
            active_user: ActiveUser {
                user: active_user_model,
            },
        })
    }

    /// List all known users (the "recent users" list)
    pub fn list_users(&self) -> Result<ListUsersResult> {
        let users = self.user_repository.list_users()?;
        debug!("Found {} users", users.len());
        Ok(ListUsersResult { users })
    }

    /// Delete a user and all of their habit data permanently
    pub fn delete_user(&self, command: DeleteUserCommand) -> Result<DeleteUserResult> {
        info!("Deleting user: {}", command.user_id);

        let user = self
            .user_repository
            .get_user(&command.user_id)?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", command.user_id))?;

        self.user_repository.delete_user(&command.user_id)?;

        info!("Deleted user: {} ({})", user.name, user.id);

        Ok(DeleteUserResult {
            success_message: format!("User '{}' deleted successfully", user.name),
        })
    }

    /// Validate a username at the login boundary
    fn validate_username(&self, username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(anyhow::anyhow!("Username cannot be empty"));
        }
        if username.len() > 100 {
            return Err(anyhow::anyhow!("Username cannot exceed 100 characters"));
        }
        Ok(())
    }
}

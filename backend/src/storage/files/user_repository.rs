use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

use super::connection::FileConnection;
use crate::domain::models::user::User as DomainUser;
use crate::storage::traits::UserStorage;

/// Intermediate struct for YAML serialization with string date fields
#[derive(Debug, Clone, Serialize, Deserialize)]
struct YamlUser {
    id: String,
    name: String,
    created_at: String,
}

/// File-based user repository using filesystem discovery: every
/// subdirectory of the data directory containing a `user.yaml` is a user.
#[derive(Clone)]
pub struct UserRepository {
    connection: Arc<FileConnection>,
}

impl UserRepository {
    /// Create a new file-based user repository
    pub fn new(connection: Arc<FileConnection>) -> Self {
        Self { connection }
    }

    /// Generate a safe filesystem identifier from a username.
    /// Converts "Emma Smith" -> "emma_smith", "José" -> "jose", etc.
    pub fn generate_safe_directory_name(username: &str) -> String {
        let mapped = username
            .chars()
            .map(|c| {
                if c.is_whitespace() {
                    '_'
                } else {
                    match c {
                        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
                        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
                        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
                        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
                        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
                        'ñ' | 'Ñ' => 'n',
                        'ç' | 'Ç' => 'c',
                        c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
                        _ => '_',
                    }
                }
            })
            .collect::<String>();

        // Collapse runs of underscores and trim the ends
        let mut collapsed = String::new();
        let mut last_was_underscore = false;
        for c in mapped.chars() {
            if c == '_' {
                if !last_was_underscore {
                    collapsed.push('_');
                }
                last_was_underscore = true;
            } else {
                collapsed.push(c);
                last_was_underscore = false;
            }
        }

        collapsed.trim_matches('_').to_string()
    }

    /// Discover all users by scanning directories
    fn discover_users(&self) -> Result<Vec<DomainUser>> {
        let base_dir = self.connection.base_directory();

        if !base_dir.exists() {
            debug!("Base directory doesn't exist, returning empty user list");
            return Ok(Vec::new());
        }

        let mut users = Vec::new();

        for entry in fs::read_dir(base_dir)? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_dir() {
                continue;
            }

            let dir_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => {
                    warn!("Skipping directory with invalid name: {:?}", path);
                    continue;
                }
            };

            match self.load_user_from_directory(dir_name) {
                Ok(Some(user)) => {
                    debug!("Discovered user: {} from directory: {}", user.name, dir_name);
                    users.push(user);
                }
                Ok(None) => {
                    debug!("Directory {} doesn't contain a valid user", dir_name);
                }
                Err(e) => {
                    warn!("Error loading user from directory {}: {}", dir_name, e);
                }
            }
        }

        users.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("Discovered {} users", users.len());
        Ok(users)
    }

    /// Load a user from a specific directory
    fn load_user_from_directory(&self, directory_name: &str) -> Result<Option<DomainUser>> {
        let yaml_path = self.connection.user_file_path(directory_name);

        if !yaml_path.exists() {
            return Ok(None);
        }

        let yaml_content = fs::read_to_string(&yaml_path)?;
        let yaml_user: YamlUser = serde_yaml::from_str(&yaml_content)?;

        let user = DomainUser {
            id: yaml_user.id,
            name: yaml_user.name,
            created_at: chrono::DateTime::parse_from_rfc3339(&yaml_user.created_at)
                .map_err(|e| anyhow::anyhow!("Failed to parse created_at: {}", e))?
                .with_timezone(&chrono::Utc),
        };

        Ok(Some(user))
    }

    /// Save a user to their directory
    fn save_user_to_directory(&self, user: &DomainUser, directory_name: &str) -> Result<()> {
        self.connection.ensure_user_directory(directory_name)?;

        let yaml_user = YamlUser {
            id: user.id.clone(),
            name: user.name.clone(),
            created_at: user.created_at.to_rfc3339(),
        };

        let yaml_path = self.connection.user_file_path(directory_name);
        let yaml_content = serde_yaml::to_string(&yaml_user)?;
        self.connection
            .write_atomic(&yaml_path, yaml_content.as_bytes())?;

        info!("Saved user {} to directory: {}", user.name, directory_name);

        Ok(())
    }

    /// Find the directory name for a user by ID
    fn find_directory_by_user_id(&self, user_id: &str) -> Result<Option<String>> {
        for user in self.discover_users()? {
            if user.id == user_id {
                let directory_name = Self::generate_safe_directory_name(&user.name);
                if let Ok(Some(loaded)) = self.load_user_from_directory(&directory_name) {
                    if loaded.id == user_id {
                        return Ok(Some(directory_name));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Get the active user directory name from global config
    fn get_active_user_directory(&self) -> Result<Option<String>> {
        let global_config_path = self.connection.global_config_path();

        if !global_config_path.exists() {
            return Ok(None);
        }

        let yaml_content = fs::read_to_string(&global_config_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&yaml_content)?;

        Ok(config
            .get("active_user_directory")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    /// Set the active user directory in global config
    fn set_active_user_directory(&self, directory_name: Option<&str>) -> Result<()> {
        let global_config_path = self.connection.global_config_path();

        let mut config = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        if let Some(directory_name) = directory_name {
            config["active_user_directory"] =
                serde_yaml::Value::String(directory_name.to_string());
        }
        config["data_format_version"] = serde_yaml::Value::String("1.0".to_string());

        let yaml_content = serde_yaml::to_string(&config)?;
        self.connection
            .write_atomic(&global_config_path, yaml_content.as_bytes())?;

        match directory_name {
            Some(name) => info!("Set active user directory to: {}", name),
            None => info!("Cleared active user directory"),
        }
        Ok(())
    }
}

impl UserStorage for UserRepository {
    /// Store a new user
    fn store_user(&self, user: &DomainUser) -> Result<()> {
        let dir_name = Self::generate_safe_directory_name(&user.name);
        self.save_user_to_directory(user, &dir_name)
    }

    /// Retrieve a specific user by ID
    fn get_user(&self, user_id: &str) -> Result<Option<DomainUser>> {
        let users = self.discover_users()?;
        Ok(users.into_iter().find(|u| u.id == user_id))
    }

    /// Find a user by their display name (exact match)
    fn find_user_by_name(&self, name: &str) -> Result<Option<DomainUser>> {
        let users = self.discover_users()?;
        Ok(users.into_iter().find(|u| u.name == name))
    }

    /// List all users ordered by name
    fn list_users(&self) -> Result<Vec<DomainUser>> {
        self.discover_users()
    }

    /// Delete a user and all of their data
    fn delete_user(&self, user_id: &str) -> Result<()> {
        if let Some(dir_name) = self.find_directory_by_user_id(user_id)? {
            let user_dir = self.connection.user_directory(&dir_name);
            if user_dir.exists() {
                fs::remove_dir_all(&user_dir)?;
                info!("Deleted user directory: {:?}", user_dir);
            }
            // Drop a dangling active pointer
            if self.get_active_user_directory()?.as_deref() == Some(dir_name.as_str()) {
                self.set_active_user_directory(None)?;
            }
        } else {
            warn!("Attempted to delete a non-existent user: {}", user_id);
        }
        Ok(())
    }

    /// Get the currently active user
    fn get_active_user(&self) -> Result<Option<String>> {
        if let Some(directory_name) = self.get_active_user_directory()? {
            if let Some(user) = self.load_user_from_directory(&directory_name)? {
                return Ok(Some(user.id));
            }
        }
        Ok(None)
    }

    /// Set the currently active user
    fn set_active_user(&self, user_id: &str) -> Result<()> {
        if let Some(directory_name) = self.find_directory_by_user_id(user_id)? {
            self.set_active_user_directory(Some(&directory_name))
        } else {
            Err(anyhow::anyhow!("User not found: {}", user_id))
        }
    }

    /// Clear the active-user pointer
    fn clear_active_user(&self) -> Result<()> {
        self.set_active_user_directory(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_repo() -> (UserRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = FileConnection::new(temp_dir.path()).unwrap();
        let repo = UserRepository::new(Arc::new(connection));
        (repo, temp_dir)
    }

    fn test_user(id: &str, name: &str) -> DomainUser {
        DomainUser {
            id: id.to_string(),
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_generate_safe_directory_name() {
        assert_eq!(
            UserRepository::generate_safe_directory_name("Emma Smith"),
            "emma_smith"
        );
        assert_eq!(UserRepository::generate_safe_directory_name("José"), "jose");
        assert_eq!(
            UserRepository::generate_safe_directory_name("User #1"),
            "user_1"
        );
        assert_eq!(
            UserRepository::generate_safe_directory_name("  spaced  out  "),
            "spaced_out"
        );
    }

    #[test]
    fn test_store_and_discover_user() {
        let (repo, _temp_dir) = setup_test_repo();

        let user = test_user("user::123", "Test User");
        repo.store_user(&user).expect("Failed to store user");

        let users = repo.list_users().expect("Failed to list users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Test User");
        assert_eq!(users[0].id, "user::123");

        let retrieved = repo.get_user("user::123").expect("Failed to get user");
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().name, "Test User");
    }

    #[test]
    fn test_find_user_by_name() {
        let (repo, _temp_dir) = setup_test_repo();

        repo.store_user(&test_user("user::1", "Alice")).unwrap();
        repo.store_user(&test_user("user::2", "Bob")).unwrap();

        let found = repo.find_user_by_name("Bob").unwrap();
        assert_eq!(found.unwrap().id, "user::2");
        assert!(repo.find_user_by_name("Carol").unwrap().is_none());
    }

    #[test]
    fn test_users_listed_sorted_by_name() {
        let (repo, _temp_dir) = setup_test_repo();

        repo.store_user(&test_user("user::1", "Zoe")).unwrap();
        repo.store_user(&test_user("user::2", "Alice")).unwrap();

        let users = repo.list_users().unwrap();
        assert_eq!(users[0].name, "Alice");
        assert_eq!(users[1].name, "Zoe");
    }

    #[test]
    fn test_active_user_management() {
        let (repo, _temp_dir) = setup_test_repo();

        assert!(repo.get_active_user().unwrap().is_none());

        let user = test_user("user::456", "Active User");
        repo.store_user(&user).unwrap();
        repo.set_active_user("user::456").unwrap();

        assert_eq!(
            repo.get_active_user().unwrap(),
            Some("user::456".to_string())
        );

        repo.clear_active_user().unwrap();
        assert!(repo.get_active_user().unwrap().is_none());
    }

    #[test]
    fn test_set_active_user_requires_existing_user() {
        let (repo, _temp_dir) = setup_test_repo();
        assert!(repo.set_active_user("user::ghost").is_err());
    }

    #[test]
    fn test_delete_user_clears_active_pointer() {
        let (repo, _temp_dir) = setup_test_repo();

        let user = test_user("user::789", "Short Lived");
        repo.store_user(&user).unwrap();
        repo.set_active_user("user::789").unwrap();

        repo.delete_user("user::789").unwrap();
        assert!(repo.get_active_user().unwrap().is_none());
        assert!(repo.get_user("user::789").unwrap().is_none());
    }
}

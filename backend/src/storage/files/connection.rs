use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// FileConnection manages the data directory layout: one subdirectory
/// per user holding `user.yaml`, `habits.yaml` and `logs.csv`, plus a
/// `global_config.yaml` at the base for the active-user pointer.
#[derive(Clone)]
pub struct FileConnection {
    base_directory: PathBuf,
}

impl FileConnection {
    /// Create a new file connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a new file connection in the default data directory,
    /// `Documents/Habit Tracker` (home directory when Documents is
    /// unavailable).
    pub fn new_default() -> Result<Self> {
        let parent = dirs::document_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

        Self::new(parent.join("Habit Tracker"))
    }

    /// Get the base directory path
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Get the directory path for a user's data
    pub fn user_directory(&self, directory_name: &str) -> PathBuf {
        self.base_directory.join(directory_name)
    }

    /// Path of a user's metadata file
    pub fn user_file_path(&self, directory_name: &str) -> PathBuf {
        self.user_directory(directory_name).join("user.yaml")
    }

    /// Path of a user's habit metadata file
    pub fn habits_file_path(&self, directory_name: &str) -> PathBuf {
        self.user_directory(directory_name).join("habits.yaml")
    }

    /// Path of a user's completion-log file
    pub fn logs_file_path(&self, directory_name: &str) -> PathBuf {
        self.user_directory(directory_name).join("logs.csv")
    }

    /// Path of the global configuration file
    pub fn global_config_path(&self) -> PathBuf {
        self.base_directory.join("global_config.yaml")
    }

    /// Ensure a user's directory exists
    pub fn ensure_user_directory(&self, directory_name: &str) -> Result<PathBuf> {
        let dir = self.user_directory(directory_name);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created user directory: {}", dir.display());
        }
        Ok(dir)
    }

    /// Atomic write using a temp file in the target directory
    pub fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<()> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_base_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("data");
        assert!(!base.exists());

        let connection = FileConnection::new(&base).unwrap();
        assert!(base.exists());
        assert_eq!(connection.base_directory(), base.as_path());
    }

    #[test]
    fn test_paths_are_scoped_per_user() {
        let temp_dir = TempDir::new().unwrap();
        let connection = FileConnection::new(temp_dir.path()).unwrap();

        let user_file = connection.user_file_path("alice");
        let habits_file = connection.habits_file_path("alice");
        let logs_file = connection.logs_file_path("alice");

        assert!(user_file.ends_with("alice/user.yaml"));
        assert!(habits_file.ends_with("alice/habits.yaml"));
        assert!(logs_file.ends_with("alice/logs.csv"));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let connection = FileConnection::new(temp_dir.path()).unwrap();
        let path = temp_dir.path().join("file.yaml");

        connection.write_atomic(&path, b"first").unwrap();
        connection.write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("tmp").exists());
    }
}

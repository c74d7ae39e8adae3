//! Backup service domain logic for the habit tracker.
//!
//! This module owns the backup snapshot format and the orchestration of
//! upload and restore against a remote drive. The drive itself is an
//! opaque named-object store behind the [`RemoteDrive`] trait; the
//! caller supplies an authorized client (token acquisition is a UI
//! concern, like the rest of presentation).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};

use crate::domain::commands::backup::{BackupResult, FetchSnapshotResult};
use crate::domain::models::habit::{Habit as DomainHabit, HabitColor, HabitFrequency};
use crate::domain::models::user::User as DomainUser;
use crate::storage::traits::RemoteDrive;
use shared::BackupSnapshot;

/// Fixed name of the backup object on the remote drive.
pub const BACKUP_FILENAME: &str = "habit_tracker_backup.json";

/// Maps domain habits onto the backup-format DTO.
struct HabitMapper;

impl HabitMapper {
    pub fn to_dto(habit: &DomainHabit) -> shared::Habit {
        shared::Habit {
            id: habit.id.clone(),
            name: habit.name.clone(),
            color: match habit.color {
                HabitColor::Green => shared::HabitColor::Green,
                HabitColor::Blue => shared::HabitColor::Blue,
                HabitColor::Violet => shared::HabitColor::Violet,
                HabitColor::Rose => shared::HabitColor::Rose,
                HabitColor::Amber => shared::HabitColor::Amber,
                HabitColor::Cyan => shared::HabitColor::Cyan,
            },
            frequency: match habit.frequency {
                HabitFrequency::Daily => shared::HabitFrequency::Daily,
                HabitFrequency::Weekly => shared::HabitFrequency::Weekly,
                HabitFrequency::Monthly => shared::HabitFrequency::Monthly,
            },
            created_at: habit.created_at.to_rfc3339(),
            logs: habit.logs.iter().map(|key| (key.clone(), true)).collect(),
        }
    }
}

/// Backup service that handles snapshot build, upload and retrieval.
#[derive(Clone)]
pub struct BackupService;

impl BackupService {
    /// Create a new BackupService instance
    pub fn new() -> Self {
        Self
    }

    /// Build the snapshot that gets serialized to the drive
    pub fn build_snapshot(
        &self,
        user: &DomainUser,
        habits: &[DomainHabit],
        timestamp: DateTime<Utc>,
    ) -> BackupSnapshot {
        BackupSnapshot {
            user: user.name.clone(),
            timestamp: timestamp.to_rfc3339(),
            habits: habits.iter().map(HabitMapper::to_dto).collect(),
        }
    }

    /// Upload a snapshot of the user's habits, creating the remote file
    /// or overwriting the previous backup in place.
    pub fn backup_to_drive(
        &self,
        drive: &dyn RemoteDrive,
        user: &DomainUser,
        habits: &[DomainHabit],
        timestamp: DateTime<Utc>,
    ) -> Result<BackupResult> {
        info!(
            "💾 BACKUP: Backing up {} habits for user: {}",
            habits.len(),
            user.name
        );

        let snapshot = self.build_snapshot(user, habits, timestamp);
        let content =
            serde_json::to_vec(&snapshot).context("Failed to serialize backup snapshot")?;

        // Overwrite the existing backup when there is one.
        let existing = drive.find_file(BACKUP_FILENAME)?;
        if existing.is_some() {
            info!("💾 BACKUP: Existing backup found, overwriting in place");
        }

        let handle = drive.upload_file(BACKUP_FILENAME, &content, existing.as_ref())?;

        info!(
            "✅ BACKUP: Saved {} ({} habits, {} bytes)",
            handle.name,
            snapshot.habits.len(),
            content.len()
        );

        Ok(BackupResult {
            file_id: handle.id,
            remote_name: handle.name,
            habit_count: snapshot.habits.len(),
        })
    }

    /// Locate, download and validate the backup snapshot.
    ///
    /// Applying the snapshot to local storage is a separate step
    /// (`HabitService::replace_habits`), so the caller can ask the user
    /// to confirm the overwrite first.
    pub fn fetch_snapshot(&self, drive: &dyn RemoteDrive) -> Result<FetchSnapshotResult> {
        info!("💾 BACKUP: Looking for backup file: {}", BACKUP_FILENAME);

        let handle = match drive.find_file(BACKUP_FILENAME)? {
            Some(handle) => handle,
            None => {
                error!("❌ BACKUP: No backup file found on the drive");
                return Err(anyhow::anyhow!("No backup file found"));
            }
        };

        let content = drive.download_file(&handle)?;
        let snapshot: BackupSnapshot =
            serde_json::from_slice(&content).context("Invalid backup format")?;

        info!(
            "✅ BACKUP: Fetched {} habits for user: {} (taken {})",
            snapshot.habits.len(),
            snapshot.user,
            snapshot.timestamp
        );

        Ok(FetchSnapshotResult { snapshot })
    }
}

impl Default for BackupService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::RemoteFileHandle;
    use std::collections::BTreeSet;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory drive standing in for the remote object store.
    #[derive(Default)]
    struct FakeDrive {
        files: Mutex<HashMap<String, Vec<u8>>>,
        fail_uploads: bool,
    }

    impl RemoteDrive for FakeDrive {
        fn find_file(&self, name: &str) -> Result<Option<RemoteFileHandle>> {
            let files = self.files.lock().unwrap();
            Ok(files.contains_key(name).then(|| RemoteFileHandle {
                id: format!("id::{}", name),
                name: name.to_string(),
            }))
        }

        fn upload_file(
            &self,
            name: &str,
            content: &[u8],
            _existing: Option<&RemoteFileHandle>,
        ) -> Result<RemoteFileHandle> {
            if self.fail_uploads {
                return Err(anyhow::anyhow!("simulated network failure"));
            }
            let mut files = self.files.lock().unwrap();
            files.insert(name.to_string(), content.to_vec());
            Ok(RemoteFileHandle {
                id: format!("id::{}", name),
                name: name.to_string(),
            })
        }

        fn download_file(&self, handle: &RemoteFileHandle) -> Result<Vec<u8>> {
            let files = self.files.lock().unwrap();
            files
                .get(&handle.name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("file vanished: {}", handle.name))
        }
    }

    fn test_user() -> DomainUser {
        DomainUser {
            id: "user::1".to_string(),
            name: "alice".to_string(),
            created_at: Utc::now(),
        }
    }

    fn test_habit(id: &str, keys: &[&str]) -> DomainHabit {
        DomainHabit {
            id: id.to_string(),
            name: "Exercise".to_string(),
            color: HabitColor::Green,
            frequency: HabitFrequency::Daily,
            created_at: Utc::now(),
            logs: keys.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_snapshot_contains_user_timestamp_and_habits() {
        let service = BackupService::new();
        let timestamp = Utc::now();
        let snapshot = service.build_snapshot(
            &test_user(),
            &[test_habit("habit::1", &["2024-03-11"])],
            timestamp,
        );

        assert_eq!(snapshot.user, "alice");
        assert_eq!(snapshot.timestamp, timestamp.to_rfc3339());
        assert_eq!(snapshot.habits.len(), 1);
        assert_eq!(snapshot.habits[0].logs.get("2024-03-11"), Some(&true));
    }

    #[test]
    fn test_backup_then_fetch_round_trips() {
        let service = BackupService::new();
        let drive = FakeDrive::default();

        let result = service
            .backup_to_drive(
                &drive,
                &test_user(),
                &[test_habit("habit::1", &["2024-03-11", "2024-03-12"])],
                Utc::now(),
            )
            .unwrap();
        assert_eq!(result.habit_count, 1);
        assert_eq!(result.remote_name, BACKUP_FILENAME);

        let fetched = service.fetch_snapshot(&drive).unwrap();
        assert_eq!(fetched.snapshot.user, "alice");
        assert_eq!(fetched.snapshot.habits[0].logs.len(), 2);
    }

    #[test]
    fn test_backup_overwrites_previous_snapshot() {
        let service = BackupService::new();
        let drive = FakeDrive::default();
        let user = test_user();

        service
            .backup_to_drive(&drive, &user, &[test_habit("habit::1", &[])], Utc::now())
            .unwrap();
        service
            .backup_to_drive(
                &drive,
                &user,
                &[
                    test_habit("habit::1", &[]),
                    test_habit("habit::2", &["2024-03-11"]),
                ],
                Utc::now(),
            )
            .unwrap();

        // Only one remote object, holding the latest snapshot.
        assert_eq!(drive.files.lock().unwrap().len(), 1);
        let fetched = service.fetch_snapshot(&drive).unwrap();
        assert_eq!(fetched.snapshot.habits.len(), 2);
    }

    #[test]
    fn test_fetch_without_backup_is_an_error() {
        let service = BackupService::new();
        let drive = FakeDrive::default();

        let err = service.fetch_snapshot(&drive).unwrap_err();
        assert!(err.to_string().contains("No backup file found"));
    }

    #[test]
    fn test_fetch_rejects_malformed_payload() {
        let service = BackupService::new();
        let drive = FakeDrive::default();
        drive
            .files
            .lock()
            .unwrap()
            .insert(BACKUP_FILENAME.to_string(), b"not json".to_vec());

        let err = service.fetch_snapshot(&drive).unwrap_err();
        assert!(err.to_string().contains("Invalid backup format"));
    }

    #[test]
    fn test_upload_failures_propagate() {
        let service = BackupService::new();
        let drive = FakeDrive {
            fail_uploads: true,
            ..FakeDrive::default()
        };

        assert!(service
            .backup_to_drive(&drive, &test_user(), &[], Utc::now())
            .is_err());
    }
}

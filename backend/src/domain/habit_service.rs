use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::commands::habits::{
    CreateHabitCommand, CreateHabitResult, DeleteHabitCommand, DeleteHabitResult,
    HabitListResult, RenameHabitCommand, RenameHabitResult, ReplaceHabitsCommand,
    ReplaceHabitsResult, ToggleHabitLogCommand, ToggleHabitLogResult,
};
use crate::domain::heatmap;
use crate::domain::models::habit::{
    Habit as DomainHabit, HabitColor, HabitFrequency, HabitValidationError,
};
use crate::domain::models::user::User as DomainUser;
use crate::domain::user_service::UserService;
use crate::storage::files::{FileConnection, HabitRepository};
use crate::storage::traits::HabitStorage;

/// Maps backup-format habit DTOs onto the domain model.
struct HabitMapper;

impl HabitMapper {
    pub fn from_dto(dto: &shared::Habit) -> Result<DomainHabit> {
        let color = match dto.color {
            shared::HabitColor::Green => HabitColor::Green,
            shared::HabitColor::Blue => HabitColor::Blue,
            shared::HabitColor::Violet => HabitColor::Violet,
            shared::HabitColor::Rose => HabitColor::Rose,
            shared::HabitColor::Amber => HabitColor::Amber,
            shared::HabitColor::Cyan => HabitColor::Cyan,
        };
        let frequency = match dto.frequency {
            shared::HabitFrequency::Daily => HabitFrequency::Daily,
            shared::HabitFrequency::Weekly => HabitFrequency::Weekly,
            shared::HabitFrequency::Monthly => HabitFrequency::Monthly,
        };
        let created_at = chrono::DateTime::parse_from_rfc3339(&dto.created_at)
            .with_context(|| format!("Invalid createdAt on habit {}", dto.id))?
            .with_timezone(&Utc);

        // Only `true` markers are meaningful; keys are kept verbatim,
        // malformed ones included (they never match a generated period).
        let logs: BTreeSet<String> = dto
            .logs
            .iter()
            .filter(|(_, logged)| **logged)
            .map(|(key, _)| key.clone())
            .collect();

        Ok(DomainHabit {
            id: dto.id.clone(),
            name: dto.name.clone(),
            color,
            frequency,
            created_at,
            logs,
        })
    }
}

/// Service for managing the active user's habits and completion logs.
#[derive(Clone)]
pub struct HabitService {
    habit_repository: HabitRepository,
    user_service: UserService,
}

impl HabitService {
    /// Create a new HabitService
    pub fn new(connection: Arc<FileConnection>, user_service: UserService) -> Self {
        let habit_repository = HabitRepository::new(connection);
        Self {
            habit_repository,
            user_service,
        }
    }

    /// Create a new habit for the active user
    pub fn create_habit(&self, command: CreateHabitCommand) -> Result<CreateHabitResult> {
        info!(
            "Creating habit: name={}, frequency={}",
            command.name,
            command.frequency.to_string()
        );

        self.validate_name(&command.name)?;

        let user = self.require_active_user()?;

        // Colors rotate through the palette in creation order.
        let existing = self.habit_repository.list_habits(&user.id)?;
        let color = HabitColor::PALETTE[existing.len() % HabitColor::PALETTE.len()];

        let now = Utc::now();
        // Bump the timestamp when two habits land in the same millisecond.
        let mut millis = now.timestamp_millis() as u64;
        while existing
            .iter()
            .any(|h| h.id == DomainHabit::generate_id(millis))
        {
            millis += 1;
        }

        let habit = DomainHabit {
            id: DomainHabit::generate_id(millis),
            name: command.name.trim().to_string(),
            color,
            frequency: command.frequency,
            created_at: now,
            logs: BTreeSet::new(),
        };

        self.habit_repository.store_habit(&user.id, &habit)?;

        info!("Created habit: {} with ID: {}", habit.name, habit.id);

        Ok(CreateHabitResult { habit })
    }

    /// List the active user's habits in creation order
    pub fn list_habits(&self) -> Result<HabitListResult> {
        let user = self.require_active_user()?;
        let habits = self.habit_repository.list_habits(&user.id)?;
        Ok(HabitListResult { habits })
    }

    /// Rename a habit. Frequency and color are immutable.
    pub fn rename_habit(&self, command: RenameHabitCommand) -> Result<RenameHabitResult> {
        info!("Renaming habit: {}", command.habit_id);

        self.validate_name(&command.name)?;

        let user = self.require_active_user()?;
        let mut habit = self
            .habit_repository
            .get_habit(&user.id, &command.habit_id)?
            .ok_or_else(|| anyhow::anyhow!("Habit not found: {}", command.habit_id))?;

        habit.name = command.name.trim().to_string();
        self.habit_repository.update_habit(&user.id, &habit)?;

        info!("Renamed habit {} to: {}", habit.id, habit.name);

        Ok(RenameHabitResult { habit })
    }

    /// Delete a habit and all of its history permanently
    pub fn delete_habit(&self, command: DeleteHabitCommand) -> Result<DeleteHabitResult> {
        info!("Deleting habit: {}", command.habit_id);

        let user = self.require_active_user()?;
        let habit = self
            .habit_repository
            .get_habit(&user.id, &command.habit_id)?
            .ok_or_else(|| anyhow::anyhow!("Habit not found: {}", command.habit_id))?;

        self.habit_repository.delete_habit(&user.id, &command.habit_id)?;

        info!("Deleted habit: {} with ID: {}", habit.name, habit.id);

        Ok(DeleteHabitResult {
            success_message: format!("Habit '{}' and all its history deleted", habit.name),
        })
    }

    /// Toggle the completion marker for the period containing `date`.
    ///
    /// The key is always derived through [`heatmap::period_key`], so a
    /// toggle lands on exactly the key the grids look up. Periods whose
    /// representative date lies strictly after `today` are not
    /// interactive and are rejected.
    pub fn toggle_log(&self, command: ToggleHabitLogCommand) -> Result<ToggleHabitLogResult> {
        let user = self.require_active_user()?;
        let habit = self
            .habit_repository
            .get_habit(&user.id, &command.habit_id)?
            .ok_or_else(|| anyhow::anyhow!("Habit not found: {}", command.habit_id))?;

        let period_key = heatmap::period_key(command.date, habit.frequency);

        if let Some(representative) = heatmap::parse_date_key(&period_key) {
            if representative > command.today {
                warn!(
                    "Rejected toggle on future period {} for habit {}",
                    period_key, habit.id
                );
                return Err(anyhow::anyhow!(
                    "Cannot log a future period ({})",
                    period_key
                ));
            }
        }

        let logged = self
            .habit_repository
            .toggle_log(&user.id, &habit.id, &period_key)?;

        info!(
            "Toggled {} for habit {}: now {}",
            period_key,
            habit.id,
            if logged { "complete" } else { "incomplete" }
        );

        let habit = self
            .habit_repository
            .get_habit(&user.id, &command.habit_id)?
            .ok_or_else(|| anyhow::anyhow!("Habit disappeared during toggle: {}", command.habit_id))?;

        Ok(ToggleHabitLogResult {
            period_key,
            logged,
            habit,
        })
    }

    /// Replace the active user's habits with a restored snapshot.
    /// The caller is responsible for confirming the overwrite first.
    pub fn replace_habits(&self, command: ReplaceHabitsCommand) -> Result<ReplaceHabitsResult> {
        info!(
            "Replacing habit collection with {} restored habits",
            command.habits.len()
        );

        let user = self.require_active_user()?;

        let habits = command
            .habits
            .iter()
            .map(HabitMapper::from_dto)
            .collect::<Result<Vec<_>>>()
            .context("Backup contains an invalid habit")?;

        self.habit_repository.replace_habits(&user.id, &habits)?;

        Ok(ReplaceHabitsResult {
            habit_count: habits.len(),
            success_message: format!("Restored {} habits", habits.len()),
        })
    }

    /// Resolve the active user or fail with an informational error
    fn require_active_user(&self) -> Result<DomainUser> {
        self.user_service
            .get_active_user()?
            .active_user
            .user
            .ok_or_else(|| anyhow::anyhow!("No user is logged in"))
    }

    /// Validate a habit name
    fn validate_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(HabitValidationError::EmptyName.into());
        }
        if name.len() > 100 {
            return Err(HabitValidationError::NameTooLong.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::users::LoginCommand;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_logged_in_service() -> (HabitService, UserService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(FileConnection::new(temp_dir.path()).unwrap());
        let user_service = UserService::new(connection.clone());
        let habit_service = HabitService::new(connection, user_service.clone());

        user_service
            .login(LoginCommand {
                username: "alice".to_string(),
            })
            .unwrap();

        (habit_service, user_service, temp_dir)
    }

    #[test]
    fn test_create_habit_assigns_id_color_and_empty_logs() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let result = service
            .create_habit(CreateHabitCommand {
                name: "Exercise".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .unwrap();

        assert!(result.habit.id.starts_with("habit::"));
        assert_eq!(result.habit.color, HabitColor::Green);
        assert!(result.habit.logs.is_empty());
    }

    #[test]
    fn test_colors_rotate_through_palette() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let mut colors = Vec::new();
        for i in 0..7 {
            let result = service
                .create_habit(CreateHabitCommand {
                    name: format!("Habit {}", i),
                    frequency: HabitFrequency::Daily,
                })
                .unwrap();
            colors.push(result.habit.color);
        }

        assert_eq!(&colors[..6], HabitColor::PALETTE.as_slice());
        assert_eq!(colors[6], HabitColor::Green);
    }

    #[test]
    fn test_create_habit_requires_login() {
        let (service, users, _temp_dir) = setup_logged_in_service();
        users.logout().unwrap();

        assert!(service
            .create_habit(CreateHabitCommand {
                name: "Exercise".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .is_err());
    }

    #[test]
    fn test_create_habit_validates_name() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        assert!(service
            .create_habit(CreateHabitCommand {
                name: "  ".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .is_err());
        assert!(service
            .create_habit(CreateHabitCommand {
                name: "x".repeat(101),
                frequency: HabitFrequency::Daily,
            })
            .is_err());
    }

    #[test]
    fn test_toggle_log_uses_period_key_for_frequency() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let habit = service
            .create_habit(CreateHabitCommand {
                name: "Read".to_string(),
                frequency: HabitFrequency::Weekly,
            })
            .unwrap()
            .habit;

        // Toggling from a Friday lands on that week's Monday key.
        let result = service
            .toggle_log(ToggleHabitLogCommand {
                habit_id: habit.id.clone(),
                date: date(2024, 3, 15),
                today: date(2024, 3, 15),
            })
            .unwrap();

        assert_eq!(result.period_key, "2024-03-11");
        assert!(result.logged);
        assert!(result.habit.logs.contains("2024-03-11"));

        // Toggling again from any day of the same week clears it.
        let result = service
            .toggle_log(ToggleHabitLogCommand {
                habit_id: habit.id,
                date: date(2024, 3, 13),
                today: date(2024, 3, 15),
            })
            .unwrap();
        assert!(!result.logged);
        assert!(result.habit.logs.is_empty());
    }

    #[test]
    fn test_toggle_log_rejects_future_periods() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let habit = service
            .create_habit(CreateHabitCommand {
                name: "Exercise".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .unwrap()
            .habit;

        assert!(service
            .toggle_log(ToggleHabitLogCommand {
                habit_id: habit.id.clone(),
                date: date(2024, 3, 16),
                today: date(2024, 3, 15),
            })
            .is_err());

        // A weekly toggle from a future day of the *current* week is
        // fine: the representative Monday is not in the future.
        let weekly = service
            .create_habit(CreateHabitCommand {
                name: "Plan".to_string(),
                frequency: HabitFrequency::Weekly,
            })
            .unwrap()
            .habit;
        assert!(service
            .toggle_log(ToggleHabitLogCommand {
                habit_id: weekly.id,
                date: date(2024, 3, 16),
                today: date(2024, 3, 15),
            })
            .is_ok());
    }

    #[test]
    fn test_rename_habit() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let habit = service
            .create_habit(CreateHabitCommand {
                name: "Exercise".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .unwrap()
            .habit;

        let renamed = service
            .rename_habit(RenameHabitCommand {
                habit_id: habit.id.clone(),
                name: "Morning Exercise".to_string(),
            })
            .unwrap();

        assert_eq!(renamed.habit.name, "Morning Exercise");
        assert_eq!(renamed.habit.frequency, habit.frequency);
        assert_eq!(renamed.habit.color, habit.color);
    }

    #[test]
    fn test_delete_habit_removes_history() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let habit = service
            .create_habit(CreateHabitCommand {
                name: "Exercise".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .unwrap()
            .habit;
        service
            .toggle_log(ToggleHabitLogCommand {
                habit_id: habit.id.clone(),
                date: date(2024, 3, 11),
                today: date(2024, 3, 15),
            })
            .unwrap();

        service
            .delete_habit(DeleteHabitCommand {
                habit_id: habit.id.clone(),
            })
            .unwrap();

        assert!(service.list_habits().unwrap().habits.is_empty());
        assert!(service
            .delete_habit(DeleteHabitCommand { habit_id: habit.id })
            .is_err());
    }

    #[test]
    fn test_replace_habits_applies_snapshot() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        service
            .create_habit(CreateHabitCommand {
                name: "Old".to_string(),
                frequency: HabitFrequency::Daily,
            })
            .unwrap();

        let mut logs = BTreeMap::new();
        logs.insert("2024-01-01".to_string(), true);
        logs.insert("ignored-false-marker".to_string(), false);

        let dto = shared::Habit {
            id: "habit::42".to_string(),
            name: "Restored".to_string(),
            color: shared::HabitColor::Blue,
            frequency: shared::HabitFrequency::Daily,
            created_at: "2024-01-01T09:00:00+00:00".to_string(),
            logs,
        };

        let result = service
            .replace_habits(ReplaceHabitsCommand { habits: vec![dto] })
            .unwrap();
        assert_eq!(result.habit_count, 1);

        let habits = service.list_habits().unwrap().habits;
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].name, "Restored");
        assert!(habits[0].logs.contains("2024-01-01"));
        assert!(!habits[0].logs.contains("ignored-false-marker"));
    }

    #[test]
    fn test_replace_habits_rejects_malformed_snapshot() {
        let (service, _users, _temp_dir) = setup_logged_in_service();

        let dto = shared::Habit {
            id: "habit::42".to_string(),
            name: "Bad".to_string(),
            color: shared::HabitColor::Blue,
            frequency: shared::HabitFrequency::Daily,
            created_at: "yesterday-ish".to_string(),
            logs: BTreeMap::new(),
        };

        assert!(service
            .replace_habits(ReplaceHabitsCommand { habits: vec![dto] })
            .is_err());
    }
}

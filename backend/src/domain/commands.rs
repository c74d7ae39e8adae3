//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are
//! **not** exposed over the public API. A frontend layer is responsible
//! for mapping its own inputs onto these internal types.

pub mod habits {
    use crate::domain::models::habit::{Habit as DomainHabit, HabitFrequency};
    use chrono::NaiveDate;

    /// Input for creating a new habit.
    #[derive(Debug, Clone)]
    pub struct CreateHabitCommand {
        pub name: String,
        pub frequency: HabitFrequency,
    }

    /// Input for renaming a habit. Frequency and color have no update path.
    #[derive(Debug, Clone)]
    pub struct RenameHabitCommand {
        pub habit_id: String,
        pub name: String,
    }

    /// Input for deleting a habit and all of its log data.
    #[derive(Debug, Clone)]
    pub struct DeleteHabitCommand {
        pub habit_id: String,
    }

    /// Input for toggling one period's completion marker.
    ///
    /// `date` is the cell the user interacted with; `today` is the
    /// reference date used to reject toggles on future periods.
    #[derive(Debug, Clone)]
    pub struct ToggleHabitLogCommand {
        pub habit_id: String,
        pub date: NaiveDate,
        pub today: NaiveDate,
    }

    /// Input for wholesale replacement of the active user's habits,
    /// used when applying a restored backup snapshot.
    #[derive(Debug, Clone)]
    pub struct ReplaceHabitsCommand {
        pub habits: Vec<shared::Habit>,
    }

    /// Result of creating a habit.
    #[derive(Debug, Clone)]
    pub struct CreateHabitResult {
        pub habit: DomainHabit,
    }

    /// Result of listing habits.
    #[derive(Debug, Clone)]
    pub struct HabitListResult {
        pub habits: Vec<DomainHabit>,
    }

    /// Result of renaming a habit.
    #[derive(Debug, Clone)]
    pub struct RenameHabitResult {
        pub habit: DomainHabit,
    }

    /// Result of deleting a habit.
    #[derive(Debug, Clone)]
    pub struct DeleteHabitResult {
        pub success_message: String,
    }

    /// Result of toggling a log entry.
    #[derive(Debug, Clone)]
    pub struct ToggleHabitLogResult {
        /// The canonical key that was toggled.
        pub period_key: String,
        /// The new state: true if the period is now marked complete.
        pub logged: bool,
        pub habit: DomainHabit,
    }

    /// Result of replacing the habit collection.
    #[derive(Debug, Clone)]
    pub struct ReplaceHabitsResult {
        pub habit_count: usize,
        pub success_message: String,
    }
}

pub mod users {
    use crate::domain::models::user::{ActiveUser, User as DomainUser};

    /// Input for logging in by username. Creates the user on first login.
    #[derive(Debug, Clone)]
    pub struct LoginCommand {
        pub username: String,
    }

    /// Input for deleting a user and all of their data.
    #[derive(Debug, Clone)]
    pub struct DeleteUserCommand {
        pub user_id: String,
    }

    /// Result of logging in.
    #[derive(Debug, Clone)]
    pub struct LoginResult {
        pub user: DomainUser,
        /// True when this login created the user.
        pub created: bool,
    }

    /// Result of logging out.
    #[derive(Debug, Clone)]
    pub struct LogoutResult {
        pub success_message: String,
    }

    /// Result of querying the active user.
    #[derive(Debug, Clone)]
    pub struct GetActiveUserResult {
        pub active_user: ActiveUser,
    }

    /// Result of listing users.
    #[derive(Debug, Clone)]
    pub struct ListUsersResult {
        pub users: Vec<DomainUser>,
    }

    /// Result of deleting a user.
    #[derive(Debug, Clone)]
    pub struct DeleteUserResult {
        pub success_message: String,
    }
}

pub mod backup {
    use shared::BackupSnapshot;

    /// Result of uploading a backup.
    #[derive(Debug, Clone)]
    pub struct BackupResult {
        /// Remote identifier of the backup object.
        pub file_id: String,
        pub remote_name: String,
        pub habit_count: usize,
    }

    /// Result of fetching a backup snapshot. Applying it to local
    /// storage is a separate step so the caller can confirm first.
    #[derive(Debug, Clone)]
    pub struct FetchSnapshotResult {
        pub snapshot: BackupSnapshot,
    }
}

pub mod insight {
    /// Result of requesting a motivational summary.
    #[derive(Debug, Clone)]
    pub struct GenerateInsightsResult {
        pub text: String,
        /// False when the text is the canned fallback line.
        pub generated: bool,
    }
}

use anyhow::{Context, Result};
use csv::{Reader, Writer};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::sync::Arc;

use super::connection::FileConnection;
use super::user_repository::UserRepository;
use crate::domain::models::habit::{Habit as DomainHabit, HabitColor, HabitFrequency};
use crate::storage::traits::{HabitStorage, UserStorage};

const LOGS_HEADER: [&str; 2] = ["habit_id", "period_key"];

/// Intermediate struct for YAML serialization with string fields.
/// Log data lives in `logs.csv`, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct YamlHabitRecord {
    id: String,
    name: String,
    color: String,
    frequency: String,
    created_at: String,
}

/// One row of a user's `logs.csv`.
#[derive(Debug, Clone, PartialEq)]
struct LogRow {
    habit_id: String,
    period_key: String,
}

/// File-based habit repository: habit metadata in `habits.yaml`,
/// completion markers as `habit_id,period_key` rows in `logs.csv`,
/// both inside the owning user's directory.
#[derive(Clone)]
pub struct HabitRepository {
    connection: Arc<FileConnection>,
    user_repository: UserRepository,
}

impl HabitRepository {
    /// Create a new file-based habit repository
    pub fn new(connection: Arc<FileConnection>) -> Self {
        let user_repository = UserRepository::new(connection.clone());
        Self {
            connection,
            user_repository,
        }
    }

    /// Resolve the directory name for a user ID
    fn user_directory_name(&self, user_id: &str) -> Result<String> {
        match self.user_repository.get_user(user_id)? {
            Some(user) => Ok(UserRepository::generate_safe_directory_name(&user.name)),
            None => Err(anyhow::anyhow!("User not found: {}", user_id)),
        }
    }

    /// Read all habit metadata records for a user
    fn read_metadata(&self, directory_name: &str) -> Result<Vec<YamlHabitRecord>> {
        let path = self.connection.habits_file_path(directory_name);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let yaml_content = fs::read_to_string(&path)?;
        if yaml_content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<YamlHabitRecord> =
            serde_yaml::from_str(&yaml_content).context("Failed to parse habits.yaml")?;
        Ok(records)
    }

    /// Write all habit metadata records for a user
    fn write_metadata(&self, directory_name: &str, records: &[YamlHabitRecord]) -> Result<()> {
        self.connection.ensure_user_directory(directory_name)?;
        let path = self.connection.habits_file_path(directory_name);
        let yaml_content = serde_yaml::to_string(records)?;
        self.connection.write_atomic(&path, yaml_content.as_bytes())
    }

    /// Read all log rows for a user from their CSV file
    fn read_log_rows(&self, directory_name: &str) -> Result<Vec<LogRow>> {
        let path = self.connection.logs_file_path(directory_name);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let habit_id = record.get(0).unwrap_or("").to_string();
            let period_key = record.get(1).unwrap_or("").to_string();
            if habit_id.is_empty() {
                warn!("Skipping log row without habit id in {}", path.display());
                continue;
            }
            rows.push(LogRow {
                habit_id,
                period_key,
            });
        }

        Ok(rows)
    }

    /// Write all log rows for a user to their CSV file
    fn write_log_rows(&self, directory_name: &str, rows: &[LogRow]) -> Result<()> {
        self.connection.ensure_user_directory(directory_name)?;
        let path = self.connection.logs_file_path(directory_name);
        let temp_path = path.with_extension("tmp");

        {
            let file = File::create(&temp_path)?;
            let writer = BufWriter::new(file);
            let mut csv_writer = Writer::from_writer(writer);

            csv_writer.write_record(LOGS_HEADER)?;
            for row in rows {
                csv_writer.write_record([&row.habit_id, &row.period_key])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Assemble domain habits from metadata plus log rows.
    /// Malformed metadata records are skipped with a warning; log rows
    /// referencing unknown habits are tolerated (and preserved on
    /// rewrite) so a partial file never loses data.
    fn assemble_habits(&self, directory_name: &str) -> Result<Vec<DomainHabit>> {
        let records = self.read_metadata(directory_name)?;
        let rows = self.read_log_rows(directory_name)?;

        let mut logs_by_habit: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            logs_by_habit
                .entry(row.habit_id)
                .or_default()
                .insert(row.period_key);
        }

        let known_ids: BTreeSet<String> = records.iter().map(|r| r.id.clone()).collect();
        for habit_id in logs_by_habit.keys() {
            if !known_ids.contains(habit_id) {
                warn!("logs.csv references unknown habit: {}", habit_id);
            }
        }

        let mut habits = Vec::new();
        for record in records {
            let color = match HabitColor::from_string(&record.color) {
                Ok(color) => color,
                Err(e) => {
                    warn!("Skipping habit {} with bad color: {}", record.id, e);
                    continue;
                }
            };
            let frequency = match HabitFrequency::from_string(&record.frequency) {
                Ok(frequency) => frequency,
                Err(e) => {
                    warn!("Skipping habit {} with bad frequency: {}", record.id, e);
                    continue;
                }
            };
            let created_at = match chrono::DateTime::parse_from_rfc3339(&record.created_at) {
                Ok(parsed) => parsed.with_timezone(&chrono::Utc),
                Err(e) => {
                    warn!("Skipping habit {} with bad created_at: {}", record.id, e);
                    continue;
                }
            };

            let logs = logs_by_habit.remove(&record.id).unwrap_or_default();
            habits.push(DomainHabit {
                id: record.id,
                name: record.name,
                color,
                frequency,
                created_at,
                logs,
            });
        }

        debug!(
            "Loaded {} habits for directory {}",
            habits.len(),
            directory_name
        );
        Ok(habits)
    }

    fn to_record(habit: &DomainHabit) -> YamlHabitRecord {
        YamlHabitRecord {
            id: habit.id.clone(),
            name: habit.name.clone(),
            color: habit.color.to_string(),
            frequency: habit.frequency.to_string(),
            created_at: habit.created_at.to_rfc3339(),
        }
    }

    fn log_rows_for(habit: &DomainHabit) -> impl Iterator<Item = LogRow> + '_ {
        habit.logs.iter().map(|key| LogRow {
            habit_id: habit.id.clone(),
            period_key: key.clone(),
        })
    }
}

impl HabitStorage for HabitRepository {
    /// Store a new habit for a user
    fn store_habit(&self, user_id: &str, habit: &DomainHabit) -> Result<()> {
        let dir_name = self.user_directory_name(user_id)?;

        let mut records = self.read_metadata(&dir_name)?;
        records.push(Self::to_record(habit));
        self.write_metadata(&dir_name, &records)?;

        if !habit.logs.is_empty() {
            let mut rows = self.read_log_rows(&dir_name)?;
            rows.extend(Self::log_rows_for(habit));
            self.write_log_rows(&dir_name, &rows)?;
        }

        info!("Stored habit {} for user {}", habit.id, user_id);
        Ok(())
    }

    /// Retrieve a specific habit by ID
    fn get_habit(&self, user_id: &str, habit_id: &str) -> Result<Option<DomainHabit>> {
        let habits = self.list_habits(user_id)?;
        Ok(habits.into_iter().find(|h| h.id == habit_id))
    }

    /// List all habits for a user in creation order
    fn list_habits(&self, user_id: &str) -> Result<Vec<DomainHabit>> {
        let dir_name = self.user_directory_name(user_id)?;
        self.assemble_habits(&dir_name)
    }

    /// Update an existing habit's metadata
    fn update_habit(&self, user_id: &str, habit: &DomainHabit) -> Result<()> {
        let dir_name = self.user_directory_name(user_id)?;

        let mut records = self.read_metadata(&dir_name)?;
        let position = records.iter().position(|r| r.id == habit.id);
        match position {
            Some(index) => {
                records[index] = Self::to_record(habit);
                self.write_metadata(&dir_name, &records)?;
                info!("Updated habit {} for user {}", habit.id, user_id);
                Ok(())
            }
            None => {
                warn!("Attempted to update a non-existent habit: {}", habit.id);
                Err(anyhow::anyhow!("Habit not found for update"))
            }
        }
    }

    /// Delete a habit and all of its log entries
    fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<bool> {
        let dir_name = self.user_directory_name(user_id)?;

        let mut records = self.read_metadata(&dir_name)?;
        let before = records.len();
        records.retain(|r| r.id != habit_id);
        if records.len() == before {
            warn!("Attempted to delete a non-existent habit: {}", habit_id);
            return Ok(false);
        }
        self.write_metadata(&dir_name, &records)?;

        let mut rows = self.read_log_rows(&dir_name)?;
        rows.retain(|row| row.habit_id != habit_id);
        self.write_log_rows(&dir_name, &rows)?;

        info!("Deleted habit {} for user {}", habit_id, user_id);
        Ok(true)
    }

    /// Toggle the presence of one period key in a habit's logs
    fn toggle_log(&self, user_id: &str, habit_id: &str, period_key: &str) -> Result<bool> {
        let dir_name = self.user_directory_name(user_id)?;

        let records = self.read_metadata(&dir_name)?;
        if !records.iter().any(|r| r.id == habit_id) {
            return Err(anyhow::anyhow!("Habit not found: {}", habit_id));
        }

        let mut rows = self.read_log_rows(&dir_name)?;
        let before = rows.len();
        rows.retain(|row| !(row.habit_id == habit_id && row.period_key == period_key));

        let logged = if rows.len() == before {
            rows.push(LogRow {
                habit_id: habit_id.to_string(),
                period_key: period_key.to_string(),
            });
            true
        } else {
            false
        };

        self.write_log_rows(&dir_name, &rows)?;

        debug!(
            "Toggled {} for habit {}: now {}",
            period_key, habit_id, logged
        );
        Ok(logged)
    }

    /// Replace the user's entire habit collection (backup restore)
    fn replace_habits(&self, user_id: &str, habits: &[DomainHabit]) -> Result<()> {
        let dir_name = self.user_directory_name(user_id)?;

        let records: Vec<YamlHabitRecord> = habits.iter().map(Self::to_record).collect();
        self.write_metadata(&dir_name, &records)?;

        let rows: Vec<LogRow> = habits.iter().flat_map(Self::log_rows_for).collect();
        self.write_log_rows(&dir_name, &rows)?;

        info!(
            "Replaced habit collection for user {}: {} habits",
            user_id,
            habits.len()
        );
        Ok(())
    }
}

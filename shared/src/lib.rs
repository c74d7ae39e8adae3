use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recurrence cadence of a habit. Fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// Palette tag used to pick heatmap colors for a habit.
///
/// This is a closed set: every variant maps to exactly one intensity ramp
/// and there is no fallback path for unknown tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitColor {
    Green,
    Blue,
    Violet,
    Rose,
    Amber,
    Cyan,
}

impl HabitColor {
    /// Intensity ramp for this color, indexed by level 0..=4.
    /// Level 0 is the shared "empty cell" shade.
    pub fn level_colors(&self) -> [&'static str; 5] {
        match self {
            HabitColor::Green => ["#161b22", "#0e4429", "#006d32", "#26a641", "#39d353"],
            HabitColor::Blue => ["#161b22", "#0a3069", "#0969da", "#409eff", "#79c0ff"],
            HabitColor::Violet => ["#161b22", "#3c1e70", "#6639ba", "#8957e5", "#bc8cff"],
            HabitColor::Rose => ["#161b22", "#67060c", "#a40e26", "#db3b5d", "#ff7b94"],
            HabitColor::Amber => ["#161b22", "#693e00", "#9e6a03", "#d4a72c", "#f2cc60"],
            HabitColor::Cyan => ["#161b22", "#024a5e", "#0d7d96", "#3ab5cf", "#76e3ea"],
        }
    }
}

/// Habit record as exchanged with frontends and the backup snapshot.
///
/// `logs` is a map from period key (`YYYY-MM-DD`) to a `true` marker:
/// absence of a key means "not completed for that period". Keys are
/// derived from the habit's own frequency (daily: the date itself,
/// weekly: the Monday of that ISO week, monthly: the first of the month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Opaque unique identifier assigned at creation.
    pub id: String,
    /// Display name, editable by the user.
    pub name: String,
    /// Palette tag, used only for rendering.
    pub color: HabitColor,
    /// Cadence; no update path exists for this field.
    pub frequency: HabitFrequency,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Completion markers keyed by period key.
    pub logs: BTreeMap<String, bool>,
}

/// One cell of the daily (year-grid) heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub date: chrono::NaiveDate,
    /// Canonical daily key for this date (`YYYY-MM-DD`).
    pub date_key: String,
    /// 0 or 1 in single-habit mode, 0..N in aggregate mode.
    pub count: u32,
    /// Intensity level 0..=4 used to pick a heatmap color.
    pub level: u8,
    /// Strictly after "today"; such cells carry no completion data
    /// and must not be interactive.
    pub is_future: bool,
}

/// Exactly 7 consecutive days, Monday through Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekEntry {
    pub days: Vec<DayEntry>,
}

/// Month annotation for the year grid: abbreviated month name plus the
/// week column it should be rendered above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthLabel {
    pub name: String,
    pub week_index: usize,
}

/// Trailing-year heatmap: week columns (oldest first) plus month labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearGrid {
    pub weeks: Vec<WeekEntry>,
    pub month_labels: Vec<MonthLabel>,
}

/// One cell of the weekly or monthly heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodEntry {
    /// Representative date: the Monday of the week, or the 1st of the month.
    pub date: chrono::NaiveDate,
    /// Canonical period key for this entry.
    pub key: String,
    /// Human-readable label ("Week of Mar 11", "March 2024").
    pub label: String,
    pub is_future: bool,
    pub completed: bool,
    /// 4 if completed, else 0.
    pub level: u8,
}

/// One column of the weekly heatmap: a month and its Mondays.
/// Months contain 4 or 5 Mondays; columns are never padded to equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyHeatmapColumn {
    pub month_label: String,
    pub weeks: Vec<PeriodEntry>,
}

/// Serialized form of a cloud backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Name of the user the snapshot belongs to.
    pub user: String,
    /// When the snapshot was taken (RFC 3339).
    pub timestamp: String,
    pub habits: Vec<Habit>,
}

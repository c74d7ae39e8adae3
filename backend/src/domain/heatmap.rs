//! Heatmap domain logic for the habit tracker.
//!
//! This module owns all period-grid computation: period-key derivation,
//! the trailing-year day grid, intensity-level calculation, and the
//! weekly/monthly period lists. The UI should only handle presentation
//! concerns; everything here is a pure computation over in-memory values.
//!
//! Reference dates ("today", the grid end date) are always passed in
//! explicitly so the functions stay deterministic and testable.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use log::{debug, info};

use crate::domain::models::habit::{Habit, HabitFrequency};
use shared::{DayEntry, MonthLabel, PeriodEntry, WeekEntry, WeeklyHeatmapColumn, YearGrid};

/// Canonical daily key for a date: `YYYY-MM-DD`.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a period key back into a date. Malformed keys yield `None`;
/// they are tolerated everywhere and simply never match a generated
/// period.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Monday on or before the given date (ISO week, week starts Monday).
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sunday on or after the given date.
pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    date + Duration::days((6 - date.weekday().num_days_from_monday()) as i64)
}

/// First day of the given date's month.
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Last day of the given date's month.
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let first = start_of_month(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next_month) => next_month - Duration::days(1),
        None => first,
    }
}

/// Returns the storage key for a habit log based on frequency.
///
/// Daily: the date itself. Weekly: the Monday of the date's week.
/// Monthly: the first day of the date's month. This is the single
/// source of truth for log keys; toggling and lookup must both go
/// through here or lookups silently fail.
pub fn period_key(date: NaiveDate, frequency: HabitFrequency) -> String {
    let representative = match frequency {
        HabitFrequency::Daily => date,
        HabitFrequency::Weekly => start_of_week(date),
        HabitFrequency::Monthly => start_of_month(date),
    };
    format_date_key(representative)
}

/// Heatmap service that handles all period-grid business logic
#[derive(Clone)]
pub struct HeatmapService;

impl HeatmapService {
    /// Create a new HeatmapService instance
    pub fn new() -> Self {
        Self
    }

    /// Generate the trailing-year day grid ending at `end_date`.
    ///
    /// The 365-day window is widened outward to full weeks: the start is
    /// aligned to the Monday on/before the window start, the end to the
    /// Sunday on/after `end_date`. Cells carry `count = 0` / `level = 0`
    /// until [`calculate_levels`](Self::calculate_levels) annotates them.
    pub fn generate_year_grid(&self, end_date: NaiveDate, today: NaiveDate) -> YearGrid {
        let window_start = end_date - Duration::days(365);
        let aligned_start = start_of_week(window_start);
        let aligned_end = end_of_week(end_date);

        debug!(
            "Generating year grid: window {} -> {}, aligned {} -> {}",
            window_start, end_date, aligned_start, aligned_end
        );

        let mut weeks: Vec<WeekEntry> = Vec::new();
        let mut current_week = WeekEntry { days: Vec::new() };
        let mut month_labels: Vec<MonthLabel> = Vec::new();

        let mut day = aligned_start;
        while day <= aligned_end {
            current_week.days.push(DayEntry {
                date: day,
                date_key: format_date_key(day),
                count: 0,
                level: 0,
                is_future: day > today,
            });

            // A month label is emitted at the first week whose first day
            // falls in a new month, but only when that day-of-month is
            // below 15, so a week that only tips into the next month at
            // its tail end is not mislabeled.
            if current_week.days.len() == 1 {
                let prev_week_first_day = weeks.last().map(|week| week.days[0].date);
                let new_month = match prev_week_first_day {
                    Some(prev) => prev.year() != day.year() || prev.month() != day.month(),
                    None => true,
                };
                if new_month && day.day() < 15 {
                    month_labels.push(MonthLabel {
                        name: day.format("%b").to_string(),
                        week_index: weeks.len(),
                    });
                }
            }

            if current_week.days.len() == 7 {
                weeks.push(current_week);
                current_week = WeekEntry { days: Vec::new() };
            }

            day += Duration::days(1);
        }

        YearGrid {
            weeks,
            month_labels,
        }
    }

    /// Annotate a grid's cells with completion counts and levels.
    ///
    /// Returns a new grid; the input is never mutated. With an active
    /// habit the level is binary (0 or 4). Without one, every habit's
    /// logs are consulted by the day's daily key and the level is
    /// bucketed by the completion ratio.
    ///
    /// Note that aggregate mode only ever checks the daily key format:
    /// weekly and monthly habits keep their logs under Monday /
    /// first-of-month keys and therefore contribute 0 to every day here.
    /// That is long-standing overview behavior, kept as is.
    pub fn calculate_levels(
        &self,
        weeks: &[WeekEntry],
        active_habit: Option<&Habit>,
        all_habits: &[Habit],
    ) -> Vec<WeekEntry> {
        let habit_total = all_habits.len().max(1);

        weeks
            .iter()
            .map(|week| WeekEntry {
                days: week
                    .days
                    .iter()
                    .map(|day| {
                        // Future days carry no completion data.
                        if day.is_future {
                            return DayEntry {
                                count: 0,
                                level: 0,
                                ..day.clone()
                            };
                        }

                        let count = match active_habit {
                            Some(habit) => u32::from(habit.logs.contains(&day.date_key)),
                            None => all_habits
                                .iter()
                                .filter(|habit| habit.logs.contains(&day.date_key))
                                .count() as u32,
                        };

                        let level = match active_habit {
                            Some(_) => {
                                if count > 0 {
                                    4
                                } else {
                                    0
                                }
                            }
                            None => {
                                let ratio = count as f64 / habit_total as f64;
                                if count == 0 {
                                    0
                                } else if ratio <= 0.25 {
                                    1
                                } else if ratio <= 0.5 {
                                    2
                                } else if ratio <= 0.75 {
                                    3
                                } else {
                                    4
                                }
                            }
                        };

                        DayEntry {
                            count,
                            level,
                            ..day.clone()
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// Generate the year grid and annotate it in one step.
    pub fn year_grid_with_levels(
        &self,
        end_date: NaiveDate,
        today: NaiveDate,
        active_habit: Option<&Habit>,
        all_habits: &[Habit],
    ) -> YearGrid {
        info!(
            "Building year grid ending {} ({} habits, active: {})",
            end_date,
            all_habits.len(),
            active_habit.map(|h| h.name.as_str()).unwrap_or("overview")
        );

        let grid = self.generate_year_grid(end_date, today);
        let weeks = self.calculate_levels(&grid.weeks, active_habit, all_habits);

        info!("Year grid ready: {} weeks", weeks.len());

        YearGrid {
            weeks,
            month_labels: grid.month_labels,
        }
    }

    /// Build the weekly heatmap for one habit: the trailing 12 months,
    /// one column per month, one entry per Monday inside that month.
    /// A month contains 4 or 5 Mondays; columns are not padded.
    pub fn generate_weekly_heatmap(
        &self,
        habit: &Habit,
        today: NaiveDate,
    ) -> Vec<WeeklyHeatmapColumn> {
        let current_month_start = start_of_month(today);
        let range_start = current_month_start
            .checked_sub_months(Months::new(11))
            .unwrap_or(current_month_start);

        let mut columns = Vec::new();

        for offset in 0..12 {
            let month_start = match range_start.checked_add_months(Months::new(offset)) {
                Some(date) => date,
                None => continue,
            };
            let month_end = end_of_month(month_start);

            let mut entries = Vec::new();
            let mut day = month_start;
            while day <= month_end {
                if day.weekday() == Weekday::Mon {
                    let key = period_key(day, HabitFrequency::Weekly);
                    let completed = habit.logs.contains(&key);
                    entries.push(PeriodEntry {
                        date: day,
                        key,
                        label: format!("Week of {}", day.format("%b %-d")),
                        is_future: day > today,
                        completed,
                        level: if completed { 4 } else { 0 },
                    });
                }
                day += Duration::days(1);
            }

            columns.push(WeeklyHeatmapColumn {
                month_label: month_start.format("%b").to_string(),
                weeks: entries,
            });
        }

        columns
    }

    /// Build the monthly heatmap for one habit: exactly 12 entries,
    /// oldest first, the current month and the 11 preceding it.
    pub fn generate_monthly_data(&self, habit: &Habit, today: NaiveDate) -> Vec<PeriodEntry> {
        let current_month_start = start_of_month(today);

        let mut entries = Vec::new();
        for offset in (0..12).rev() {
            let month_start = match current_month_start.checked_sub_months(Months::new(offset)) {
                Some(date) => date,
                None => continue,
            };
            let key = period_key(month_start, HabitFrequency::Monthly);
            let completed = habit.logs.contains(&key);
            entries.push(PeriodEntry {
                date: month_start,
                key,
                label: month_start.format("%B %Y").to_string(),
                is_future: month_start > current_month_start,
                completed,
                level: if completed { 4 } else { 0 },
            });
        }

        entries
    }
}

impl Default for HeatmapService {
    fn default() -> Self {
        Self::new()
    }
}

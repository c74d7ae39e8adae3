use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Recurrence cadence of a habit. Set at creation, no update path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl HabitFrequency {
    /// Convert to string for file storage
    pub fn to_string(&self) -> String {
        match self {
            HabitFrequency::Daily => "DAILY".to_string(),
            HabitFrequency::Weekly => "WEEKLY".to_string(),
            HabitFrequency::Monthly => "MONTHLY".to_string(),
        }
    }

    /// Parse from string for file loading
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "DAILY" => Ok(HabitFrequency::Daily),
            "WEEKLY" => Ok(HabitFrequency::Weekly),
            "MONTHLY" => Ok(HabitFrequency::Monthly),
            _ => Err(format!("Invalid habit frequency: {}", s)),
        }
    }
}

/// Palette tag assigned at creation and used only for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HabitColor {
    Green,
    Blue,
    Violet,
    Rose,
    Amber,
    Cyan,
}

impl HabitColor {
    /// Fixed palette, in assignment order.
    pub const PALETTE: [HabitColor; 6] = [
        HabitColor::Green,
        HabitColor::Blue,
        HabitColor::Violet,
        HabitColor::Rose,
        HabitColor::Amber,
        HabitColor::Cyan,
    ];

    /// Convert to string for file storage
    pub fn to_string(&self) -> String {
        match self {
            HabitColor::Green => "green".to_string(),
            HabitColor::Blue => "blue".to_string(),
            HabitColor::Violet => "violet".to_string(),
            HabitColor::Rose => "rose".to_string(),
            HabitColor::Amber => "amber".to_string(),
            HabitColor::Cyan => "cyan".to_string(),
        }
    }

    /// Parse from string for file loading
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "green" => Ok(HabitColor::Green),
            "blue" => Ok(HabitColor::Blue),
            "violet" => Ok(HabitColor::Violet),
            "rose" => Ok(HabitColor::Rose),
            "amber" => Ok(HabitColor::Amber),
            "cyan" => Ok(HabitColor::Cyan),
            _ => Err(format!("Invalid habit color: {}", s)),
        }
    }
}

/// Domain model for a tracked habit.
///
/// `logs` holds the set of period keys the user has marked complete.
/// Every key the domain writes is derived from a valid date under this
/// habit's own frequency; keys that do not parse as dates are tolerated
/// on read (they never match a generated period) but never produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub color: HabitColor,
    pub frequency: HabitFrequency,
    pub created_at: DateTime<Utc>,
    pub logs: BTreeSet<String>,
}

impl Habit {
    /// Generate a unique ID for a habit
    pub fn generate_id(timestamp_millis: u64) -> String {
        format!("habit::{}", timestamp_millis)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HabitValidationError {
    #[error("Habit name cannot be empty")]
    EmptyName,
    #[error("Habit name cannot exceed 100 characters")]
    NameTooLong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_string_round_trip() {
        for frequency in [
            HabitFrequency::Daily,
            HabitFrequency::Weekly,
            HabitFrequency::Monthly,
        ] {
            let stored = frequency.to_string();
            assert_eq!(HabitFrequency::from_string(&stored).unwrap(), frequency);
        }
        assert!(HabitFrequency::from_string("FORTNIGHTLY").is_err());
    }

    #[test]
    fn test_color_string_round_trip() {
        for color in HabitColor::PALETTE {
            let stored = color.to_string();
            assert_eq!(HabitColor::from_string(&stored).unwrap(), color);
        }
        assert!(HabitColor::from_string("magenta").is_err());
    }

    #[test]
    fn test_generate_id() {
        assert_eq!(Habit::generate_id(1700000000000), "habit::1700000000000");
    }
}

//! Weekly blocking schedule
//!
//! A schedule is a set of weekdays (0 = Sunday .. 6 = Saturday) and an hour
//! window `[start_hour, end_hour)` in local time.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{BlockerError, Result};

pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Recurring weekly blocking window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Weekdays on which blocking applies (0 = Sunday)
    pub days: Vec<u8>,
    /// First blocked hour (inclusive)
    pub start_hour: u8,
    /// First unblocked hour (exclusive)
    pub end_hour: u8,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            days: vec![1, 2, 3, 4, 5],
            start_hour: 1,
            end_hour: 15,
        }
    }
}

impl Schedule {
    /// Whether the given weekday/hour pair falls inside the window
    pub fn contains(&self, weekday: u8, hour: u8) -> bool {
        if !self.days.contains(&weekday) {
            return false;
        }
        hour >= self.start_hour && hour < self.end_hour
    }

    /// Whether blocking is scheduled at the given instant, in its own timezone
    pub fn is_active_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        let weekday = at.weekday().num_days_from_sunday() as u8;
        let hour = at.hour() as u8;
        self.contains(weekday, hour)
    }

    /// Reject days outside 0..=6 and hour windows that can never match.
    ///
    /// `end_hour` may be 24 to block through midnight.
    pub fn validate(&self) -> Result<()> {
        if let Some(day) = self.days.iter().find(|d| **d > 6) {
            return Err(BlockerError::InvalidConfig(format!(
                "day {} out of range (0 = Sunday .. 6 = Saturday)",
                day
            )));
        }
        if self.start_hour > 23 {
            return Err(BlockerError::InvalidConfig(format!(
                "startHour {} out of range 0..=23",
                self.start_hour
            )));
        }
        if self.end_hour > 24 {
            return Err(BlockerError::InvalidConfig(format!(
                "endHour {} out of range 0..=24",
                self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(BlockerError::InvalidConfig(format!(
                "startHour {} must be before endHour {}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    /// Names of the configured days, in configured order
    pub fn day_names(&self) -> Vec<&'static str> {
        self.days
            .iter()
            .filter_map(|d| DAY_NAMES.get(*d as usize).copied())
            .collect()
    }

    /// "Monday, Tuesday" style summary
    pub fn days_label(&self) -> String {
        self.day_names().join(", ")
    }

    /// "1:00 AM - 3:00 PM" style summary
    pub fn hours_label(&self) -> String {
        format!("{} - {}", format_hour(self.start_hour), format_hour(self.end_hour))
    }
}

/// Format an hour of the day on a 12-hour clock
pub fn format_hour(hour: u8) -> String {
    match hour {
        0 | 24 => "12:00 AM".to_string(),
        12 => "12:00 PM".to_string(),
        h if h < 12 => format!("{}:00 AM", h),
        h => format!("{}:00 PM", h - 12),
    }
}

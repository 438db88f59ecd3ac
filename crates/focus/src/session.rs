//! Manual focus sessions
//!
//! A manual focus session forces blocking until its end time, regardless of
//! schedule. It only records when it ends; there is no way to stop one early.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of a manual focus session
pub const MANUAL_FOCUS_MINUTES: i64 = 60;

/// A pending manual focus session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualFocusSession {
    /// When blocking is released (Unix epoch millis)
    pub end_time: i64,
}

impl ManualFocusSession {
    /// Session starting at `now` and lasting the fixed duration
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let end = now + Duration::minutes(MANUAL_FOCUS_MINUTES);
        Self {
            end_time: end.timestamp_millis(),
        }
    }

    pub fn from_millis(end_time: i64) -> Self {
        Self { end_time }
    }

    /// Get the end time as a DateTime
    pub fn end(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.end_time).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether the session still forces blocking at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.end_time
    }

    /// Remaining whole minutes, rounded up, zero once expired
    pub fn remaining_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        let remaining_ms = self.end_time - now.timestamp_millis();
        if remaining_ms <= 0 {
            0
        } else {
            (remaining_ms + 59_999) / 60_000
        }
    }

    /// Of two sessions, the one that ends later
    pub fn later(self, other: Self) -> Self {
        if other.end_time > self.end_time {
            other
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 13, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_one_hour_session() {
        let session = ManualFocusSession::starting_at(t0());
        assert_eq!(session.end(), t0() + Duration::hours(1));
        assert!(session.is_active_at(t0()));
        assert!(session.is_active_at(t0() + Duration::minutes(59)));
        assert!(!session.is_active_at(t0() + Duration::minutes(60)));
    }

    #[test]
    fn test_remaining_minutes() {
        let session = ManualFocusSession::starting_at(t0());
        assert_eq!(session.remaining_minutes_at(t0()), 60);
        assert_eq!(session.remaining_minutes_at(t0() + Duration::seconds(30)), 60);
        assert_eq!(session.remaining_minutes_at(t0() + Duration::minutes(59)), 1);
        assert_eq!(session.remaining_minutes_at(t0() + Duration::minutes(61)), 0);
    }

    #[test]
    fn test_later_keeps_max() {
        let early = ManualFocusSession::starting_at(t0());
        let late = ManualFocusSession::starting_at(t0() + Duration::minutes(10));
        assert_eq!(early.later(late), late);
        assert_eq!(late.later(early), late);
    }

    #[test]
    fn test_persisted_shape() {
        let session = ManualFocusSession::from_millis(1_000);
        assert_eq!(serde_json::to_string(&session).unwrap(), r#"{"endTime":1000}"#);
    }
}

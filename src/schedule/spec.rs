//! Task schedule shapes
//!
//! A task carries at most one schedule, one of four mutually exclusive
//! shapes tagged by `schedule_type` in the stored JSON:
//!
//! ```json
//! {"schedule_type": "deadline", "due_date": "2024-03-01"}
//! {"schedule_type": "daily_hours", "start_date": "2024-01-01",
//!  "windows": [{"start": "09:00", "end": "12:00"}]}
//! {"schedule_type": "weekly_days", "start_date": "2024-01-01",
//!  "slots": [{"day_of_week": 1, "window": {"start": "09:00", "end": "17:00"}}]}
//! {"schedule_type": "monthly_day", "start_date": "2024-01-01",
//!  "monthly_day": 31, "monthly_time": "10:00"}
//! ```
//!
//! Times of day are local `HH:MM` 24-hour values.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Serde adapter for `HH:MM` time-of-day values
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `HH:MM` values
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::hhmm::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(raw) => NaiveTime::parse_from_str(&raw, super::hhmm::FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Parse an `HH:MM` string outside of serde, e.g. from form input
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(raw, hhmm::FORMAT)
        .map_err(|_| EngineError::invalid_schedule(format!("'{}' is not a valid HH:MM time", raw)))
}

/// A time-of-day window within a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// An inverted window (`end` before `start`) is a data-entry error
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// Display duration, clamped to non-negative
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }
}

/// One weekday slot of a weekly schedule; no window means all-day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdaySlot {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    #[serde(default)]
    pub window: Option<TimeWindow>,
}

/// A task's recurrence schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schedule_type", rename_all = "snake_case")]
pub enum TaskSchedule {
    /// A single due date, no recurrence
    Deadline { due_date: NaiveDate },
    /// The same time windows every calendar day in range
    DailyHours {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
        windows: Vec<TimeWindow>,
    },
    /// Only on the configured weekdays
    WeeklyDays {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
        slots: Vec<WeekdaySlot>,
    },
    /// A fixed day of every month, clamped to short months
    MonthlyDay {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
        monthly_day: u32,
        #[serde(default, with = "hhmm_opt")]
        monthly_time: Option<NaiveTime>,
    },
}

impl TaskSchedule {
    /// Check the schedule's invariants
    ///
    /// An empty weekly slot set is deliberately allowed; it projects to zero
    /// occurrences, which is a valid state, not an error.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            Self::Deadline { .. } => Ok(()),
            Self::DailyHours {
                start_date,
                end_date,
                windows,
            } => {
                check_date_range(*start_date, *end_date)?;
                if windows.is_empty() {
                    return Err(EngineError::invalid_schedule(
                        "daily_hours requires at least one time window",
                    ));
                }
                for window in windows {
                    check_window(window)?;
                }
                Ok(())
            }
            Self::WeeklyDays {
                start_date,
                end_date,
                slots,
            } => {
                check_date_range(*start_date, *end_date)?;
                for slot in slots {
                    if slot.day_of_week > 6 {
                        return Err(EngineError::invalid_schedule(format!(
                            "day_of_week {} is out of range 0..6",
                            slot.day_of_week
                        )));
                    }
                    if let Some(window) = &slot.window {
                        check_window(window)?;
                    }
                }
                Ok(())
            }
            Self::MonthlyDay {
                start_date,
                end_date,
                monthly_day,
                ..
            } => {
                check_date_range(*start_date, *end_date)?;
                if !(1..=31).contains(monthly_day) {
                    return Err(EngineError::invalid_schedule(format!(
                        "monthly_day {} is out of range 1..31",
                        monthly_day
                    )));
                }
                Ok(())
            }
        }
    }

    /// First date the schedule can produce an occurrence on
    pub fn start_date(&self) -> NaiveDate {
        match self {
            Self::Deadline { due_date } => *due_date,
            Self::DailyHours { start_date, .. }
            | Self::WeeklyDays { start_date, .. }
            | Self::MonthlyDay { start_date, .. } => *start_date,
        }
    }

    /// Last date the schedule can produce an occurrence on, if bounded
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Deadline { due_date } => Some(*due_date),
            Self::DailyHours { end_date, .. }
            | Self::WeeklyDays { end_date, .. }
            | Self::MonthlyDay { end_date, .. } => *end_date,
        }
    }
}

fn check_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), EngineError> {
    if let Some(end) = end {
        if end < start {
            return Err(EngineError::invalid_schedule(format!(
                "end_date {} is before start_date {}",
                end, start
            )));
        }
    }
    Ok(())
}

fn check_window(window: &TimeWindow) -> Result<(), EngineError> {
    if window.is_inverted() {
        return Err(EngineError::invalid_schedule(format!(
            "time window ends ({}) before it starts ({})",
            window.end.format(hhmm::FORMAT),
            window.start.format(hhmm::FORMAT)
        )));
    }
    Ok(())
}

//! Validated schedule input
//!
//! [`ScheduleForm`] is the flat shape task-save requests carry when a task's
//! scheduling fields are set. Field-level rules run through the `validator`
//! crate; [`ScheduleForm::into_schedule`] then builds the typed
//! [`TaskSchedule`] and applies its structural invariants.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{EngineError, ValidationErrors};
use crate::schedule::spec::{parse_hhmm, TaskSchedule, TimeWindow, WeekdaySlot};

/// One `HH:MM` time window in form input
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowForm {
    pub start_time: String,
    pub end_time: String,
}

/// One weekday slot in form input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WeekdayForm {
    /// 0 = Sunday .. 6 = Saturday
    #[validate(range(min = 0, max = 6, message = "day_of_week must be between 0 and 6"))]
    pub day_of_week: u8,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Flat schedule input, as submitted when saving a task
///
/// # Example
///
/// ```rust,ignore
/// let form: ScheduleForm = serde_json::from_slice(&body)?;
/// let schedule = form.into_schedule()?;
/// store::set_task_schedule(conn, task_id, Some(&schedule)).await?;
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScheduleForm {
    /// "deadline" | "daily_hours" | "weekly_days" | "monthly_day"
    pub schedule_type: String,
    pub due_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "at least one time window is required"))]
    pub windows: Option<Vec<WindowForm>>,
    #[validate(nested)]
    pub week_days: Option<Vec<WeekdayForm>>,
    #[validate(range(min = 1, max = 31, message = "monthly_day must be between 1 and 31"))]
    pub monthly_day: Option<u32>,
    pub monthly_time: Option<String>,
}

impl ScheduleForm {
    /// Validate the form and convert it into a typed schedule
    pub fn into_schedule(self) -> Result<TaskSchedule, EngineError> {
        self.validate()
            .map_err(|e| EngineError::Validation(ValidationErrors::from_validator(e)))?;

        let schedule = match self.schedule_type.as_str() {
            "deadline" => TaskSchedule::Deadline {
                due_date: self
                    .due_date
                    .ok_or_else(|| EngineError::invalid_schedule("deadline requires due_date"))?,
            },
            "daily_hours" => TaskSchedule::DailyHours {
                start_date: required_start(self.start_date)?,
                end_date: self.end_date,
                windows: self
                    .windows
                    .unwrap_or_default()
                    .into_iter()
                    .map(|w| {
                        Ok(TimeWindow::new(
                            parse_hhmm(&w.start_time)?,
                            parse_hhmm(&w.end_time)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, EngineError>>()?,
            },
            "weekly_days" => TaskSchedule::WeeklyDays {
                start_date: required_start(self.start_date)?,
                end_date: self.end_date,
                slots: self
                    .week_days
                    .unwrap_or_default()
                    .into_iter()
                    .map(|slot| {
                        let window = match (slot.start_time, slot.end_time) {
                            (Some(start), Some(end)) => {
                                Some(TimeWindow::new(parse_hhmm(&start)?, parse_hhmm(&end)?))
                            }
                            (None, None) => None,
                            _ => {
                                return Err(EngineError::invalid_schedule(
                                    "weekly slot must set both start_time and end_time, or neither",
                                ))
                            }
                        };
                        Ok(WeekdaySlot {
                            day_of_week: slot.day_of_week,
                            window,
                        })
                    })
                    .collect::<Result<Vec<_>, EngineError>>()?,
            },
            "monthly_day" => TaskSchedule::MonthlyDay {
                start_date: required_start(self.start_date)?,
                end_date: self.end_date,
                monthly_day: self.monthly_day.ok_or_else(|| {
                    EngineError::invalid_schedule("monthly_day schedules require monthly_day")
                })?,
                monthly_time: self.monthly_time.as_deref().map(parse_hhmm).transpose()?,
            },
            other => {
                return Err(EngineError::invalid_schedule(format!(
                    "unknown schedule_type '{}'",
                    other
                )))
            }
        };

        schedule.validate()?;
        Ok(schedule)
    }
}

fn required_start(start_date: Option<NaiveDate>) -> Result<NaiveDate, EngineError> {
    start_date.ok_or_else(|| EngineError::invalid_schedule("start_date is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn builds_daily_hours_from_form_json() {
        let form: ScheduleForm = serde_json::from_str(
            r#"{
                "schedule_type": "daily_hours",
                "start_date": "2024-01-01",
                "windows": [
                    {"start_time": "09:00", "end_time": "12:00"},
                    {"start_time": "13:00", "end_time": "17:00"}
                ]
            }"#,
        )
        .unwrap();

        let schedule = form.into_schedule().unwrap();
        match schedule {
            TaskSchedule::DailyHours { windows, .. } => {
                assert_eq!(windows.len(), 2);
                assert_eq!(windows[0].start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
            }
            other => panic!("wrong shape: {:?}", other),
        }
    }

    #[test]
    fn rejects_monthly_day_out_of_range_via_validator() {
        let form = ScheduleForm {
            schedule_type: "monthly_day".into(),
            due_date: None,
            start_date: Some(date(2024, 1, 1)),
            end_date: None,
            windows: None,
            week_days: None,
            monthly_day: Some(32),
            monthly_time: None,
        };
        assert!(matches!(
            form.into_schedule(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_window_list_via_validator() {
        let form = ScheduleForm {
            schedule_type: "daily_hours".into(),
            due_date: None,
            start_date: Some(date(2024, 1, 1)),
            end_date: None,
            windows: Some(vec![]),
            week_days: None,
            monthly_day: None,
            monthly_time: None,
        };
        assert!(matches!(
            form.into_schedule(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn rejects_malformed_times_and_unknown_types() {
        let form = ScheduleForm {
            schedule_type: "daily_hours".into(),
            due_date: None,
            start_date: Some(date(2024, 1, 1)),
            end_date: None,
            windows: Some(vec![WindowForm {
                start_time: "nine".into(),
                end_time: "17:00".into(),
            }]),
            week_days: None,
            monthly_day: None,
            monthly_time: None,
        };
        assert!(form.into_schedule().is_err());

        let form = ScheduleForm {
            schedule_type: "fortnightly".into(),
            due_date: None,
            start_date: Some(date(2024, 1, 1)),
            end_date: None,
            windows: None,
            week_days: None,
            monthly_day: None,
            monthly_time: None,
        };
        assert!(form.into_schedule().is_err());
    }

    #[test]
    fn weekly_form_builds_slots_with_optional_windows() {
        let form: ScheduleForm = serde_json::from_str(
            r#"{
                "schedule_type": "weekly_days",
                "start_date": "2024-01-01",
                "week_days": [
                    {"day_of_week": 1, "start_time": "09:00", "end_time": "17:00"},
                    {"day_of_week": 3}
                ]
            }"#,
        )
        .unwrap();

        match form.into_schedule().unwrap() {
            TaskSchedule::WeeklyDays { slots, .. } => {
                assert_eq!(slots.len(), 2);
                assert!(slots[0].window.is_some());
                assert!(slots[1].window.is_none());
            }
            other => panic!("wrong shape: {:?}", other),
        }
    }

    #[test]
    fn inverted_range_fails_structural_validation() {
        let form = ScheduleForm {
            schedule_type: "weekly_days".into(),
            due_date: None,
            start_date: Some(date(2024, 2, 1)),
            end_date: Some(date(2024, 1, 1)),
            windows: None,
            week_days: None,
            monthly_day: None,
            monthly_time: None,
        };
        assert!(matches!(
            form.into_schedule(),
            Err(EngineError::InvalidScheduleRange { .. })
        ));
    }
}

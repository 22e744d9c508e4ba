//! Recurrence schedules and occurrence projection
//!
//! A task may carry one [`TaskSchedule`] describing when it occupies the
//! calendar: a single deadline, repeating daily time windows, specific
//! weekdays, or a fixed day of every month. [`occurrences`] expands a
//! schedule into concrete [`Occurrence`] values over a query window; the
//! expansion is pure date math with no storage or rendering concerns.
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use taskflow::schedule::{occurrences, TaskSchedule};
//!
//! let schedule: TaskSchedule = serde_json::from_str(task.schedule.as_deref().unwrap())?;
//! let month_start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let month_end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
//! for occurrence in occurrences(&schedule, month_start, month_end) {
//!     println!("{} {:?}", occurrence.date, occurrence.start_time);
//! }
//! ```

pub mod form;
pub mod projector;
pub mod spec;

pub use form::{ScheduleForm, WeekdayForm, WindowForm};
pub use projector::{occurrences, Occurrence, Occurrences};
pub use spec::{parse_hhmm, TaskSchedule, TimeWindow, WeekdaySlot};

//! Occurrence projection
//!
//! Expands a [`TaskSchedule`] into the concrete calendar occurrences that
//! fall inside a query window. The projection is a pure function of its
//! inputs: calling [`occurrences`] twice with the same arguments yields the
//! same sequence, and nothing is read from or written to storage.
//!
//! Termination contract: iteration is always bounded by
//! `min(schedule.end_date, query_end)`. A schedule with no end date can never
//! cause an unbounded walk because the query window itself caps the range.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::schedule::spec::{TaskSchedule, TimeWindow};

/// One concrete calendar instance of a schedule
///
/// `start_time`/`end_time` absent means all-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl Occurrence {
    fn all_day(date: NaiveDate) -> Self {
        Self {
            date,
            start_time: None,
            end_time: None,
        }
    }

    fn windowed(date: NaiveDate, window: TimeWindow) -> Self {
        Self {
            date,
            start_time: Some(window.start),
            end_time: Some(window.end),
        }
    }

    fn at(date: NaiveDate, start: Option<NaiveTime>) -> Self {
        Self {
            date,
            start_time: start,
            end_time: None,
        }
    }

    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }

    /// Display duration, clamped to non-negative
    pub fn duration_minutes(&self) -> i64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).num_minutes().max(0),
            _ => 0,
        }
    }
}

/// Project `schedule` over the inclusive window `[query_start, query_end]`
///
/// Returns a lazy iterator; an inverted or non-overlapping window yields an
/// empty sequence.
pub fn occurrences(
    schedule: &TaskSchedule,
    query_start: NaiveDate,
    query_end: NaiveDate,
) -> Occurrences<'_> {
    Occurrences::new(schedule, query_start, query_end)
}

/// Lazy, restartable iterator over a schedule's occurrences in a window
pub struct Occurrences<'a> {
    schedule: &'a TaskSchedule,
    /// Next candidate date; for monthly schedules, the first of the month
    /// currently being examined
    cursor: NaiveDate,
    /// First date that may be emitted
    lower: NaiveDate,
    /// Last date that may be emitted: min(schedule end, query end)
    upper: NaiveDate,
    /// Index into a day's windows/slots
    slot_index: usize,
    done: bool,
}

impl<'a> Occurrences<'a> {
    fn new(schedule: &'a TaskSchedule, query_start: NaiveDate, query_end: NaiveDate) -> Self {
        let lower = schedule.start_date().max(query_start);
        let upper = match schedule.end_date() {
            Some(end) => end.min(query_end),
            None => query_end,
        };

        let done = query_start > query_end || lower > upper;

        let cursor = match schedule {
            // month stepping is anchored at the schedule start's month so the
            // clamped target day is computed per month, never carried over
            TaskSchedule::MonthlyDay { start_date, .. } => {
                first_of_month(start_date.year(), start_date.month())
            }
            _ => lower,
        };

        Self {
            schedule,
            cursor,
            lower,
            upper,
            slot_index: 0,
            done,
        }
    }

    fn advance_day(&mut self) {
        self.slot_index = 0;
        match self.cursor.succ_opt() {
            Some(next) => self.cursor = next,
            None => self.done = true,
        }
    }

    fn advance_month(&mut self) {
        self.slot_index = 0;
        let (year, month) = if self.cursor.month() == 12 {
            (self.cursor.year() + 1, 1)
        } else {
            (self.cursor.year(), self.cursor.month() + 1)
        };
        self.cursor = first_of_month(year, month);
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.done {
            return None;
        }

        match self.schedule {
            TaskSchedule::Deadline { due_date } => {
                self.done = true;
                if *due_date >= self.lower && *due_date <= self.upper {
                    Some(Occurrence::all_day(*due_date))
                } else {
                    None
                }
            }

            TaskSchedule::DailyHours { windows, .. } => loop {
                if self.done || self.cursor > self.upper {
                    self.done = true;
                    return None;
                }
                if let Some(window) = windows.get(self.slot_index) {
                    self.slot_index += 1;
                    return Some(Occurrence::windowed(self.cursor, *window));
                }
                self.advance_day();
            },

            TaskSchedule::WeeklyDays { slots, .. } => loop {
                if self.done || self.cursor > self.upper {
                    self.done = true;
                    return None;
                }
                let weekday = self.cursor.weekday().num_days_from_sunday() as u8;
                while let Some(slot) = slots.get(self.slot_index) {
                    self.slot_index += 1;
                    if slot.day_of_week == weekday {
                        let occurrence = match slot.window {
                            Some(window) => Occurrence::windowed(self.cursor, window),
                            None => Occurrence::all_day(self.cursor),
                        };
                        return Some(occurrence);
                    }
                }
                self.advance_day();
            },

            TaskSchedule::MonthlyDay {
                monthly_day,
                monthly_time,
                ..
            } => loop {
                if self.done || self.cursor > self.upper {
                    self.done = true;
                    return None;
                }
                let year = self.cursor.year();
                let month = self.cursor.month();
                // clamp to short months: day 31 in February becomes Feb 28/29
                let day = (*monthly_day).min(days_in_month(year, month));
                let candidate = NaiveDate::from_ymd_opt(year, month, day);
                self.advance_month();

                match candidate {
                    Some(candidate) if candidate > self.upper => {
                        self.done = true;
                        return None;
                    }
                    Some(candidate) if candidate >= self.lower => {
                        return Some(Occurrence::at(candidate, *monthly_time));
                    }
                    _ => {}
                }
            },
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

//! Status-duration accounting
//!
//! Pure reads over a task's append-only status time log. The write side (the
//! close-and-open pair performed on every accepted transition) lives in
//! [`crate::workflow::store::record_transition`]; everything here is a
//! side-effect-free function of already persisted rows, safe to call
//! concurrently and repeatedly.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::workflow::entities::status_time_logs;

/// Total seconds spent per status, as of `as_of`
///
/// Closed entries contribute their recorded `duration_seconds`, bucketed by
/// the status they opened (`to_status`). The open entry, if any, contributes
/// `as_of - entered_at` so "time in current status so far" shows up in a live
/// summary without touching the ledger. The result is monotonically
/// non-decreasing in `as_of`.
pub fn summarize(
    entries: &[status_time_logs::Model],
    as_of: NaiveDateTime,
) -> BTreeMap<String, i64> {
    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for entry in entries {
        let seconds = match (entry.exited_at, entry.duration_seconds) {
            (Some(_), Some(duration)) => duration,
            // closed rows always carry a duration; recompute for legacy rows
            (Some(exited), None) => (exited - entry.entered_at).num_seconds().max(0),
            (None, _) => (as_of - entry.entered_at).num_seconds().max(0),
        };
        *totals.entry(entry.to_status.clone()).or_insert(0) += seconds;
    }
    totals
}

/// Log entries ordered by `entered_at` ascending
pub fn timeline(mut entries: Vec<status_time_logs::Model>) -> Vec<status_time_logs::Model> {
    entries.sort_by(|a, b| (a.entered_at, a.id).cmp(&(b.entered_at, b.id)));
    entries
}

/// The currently open interval, if any
pub fn open_entry(entries: &[status_time_logs::Model]) -> Option<&status_time_logs::Model> {
    entries.iter().find(|entry| entry.exited_at.is_none())
}

//! Per-employee, per-day attendance state.
//!
//! Each employee toggles between "no event / checked out" and "checked in"
//! within a calendar day. The read of the last event and the append of the
//! next one form a single atomic step per employee; different employees do
//! not wait on each other.

#[cfg(test)]
mod memory;
mod mysql;

#[cfg(test)]
pub use memory::MemoryLedger;
pub use mysql::MySqlLedger;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::model::attendance::AttendanceEvent;

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Appends the next event for `employee_id` on the day of `at`, choosing
    /// check-in or check-out from the last event of that day.
    async fn record(
        &self,
        employee_id: u64,
        device_id: u64,
        at: NaiveDateTime,
    ) -> Result<AttendanceEvent, AppError>;

    /// Events of one employee on one calendar day, oldest first.
    async fn events_on(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AppError>;
}

/// Half-open `[start, end)` bounds of `day`.
pub(crate) fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(chrono::NaiveTime::MIN);
    let end = day
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

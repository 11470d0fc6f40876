use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::AttendanceLedger;
use crate::error::AppError;
use crate::model::attendance::{AttendanceAction, AttendanceEvent};

type EventLog = Arc<Mutex<Vec<AttendanceEvent>>>;

/// In-process ledger with one lock per employee.
///
/// The outer map lock is held only to find or create an employee's entry.
#[derive(Default)]
pub struct MemoryLedger {
    employees: Mutex<HashMap<u64, EventLog>>,
    next_id: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, employee_id: u64) -> EventLog {
        lock(&self.employees)
            .entry(employee_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl AttendanceLedger for MemoryLedger {
    async fn record(
        &self,
        employee_id: u64,
        device_id: u64,
        at: NaiveDateTime,
    ) -> Result<AttendanceEvent, AppError> {
        let entry = self.entry(employee_id);
        let mut events = lock(&entry);

        let day = at.date();
        let last_today = events
            .iter()
            .filter(|e| e.occurred_at.date() == day)
            .max_by_key(|e| (e.occurred_at, e.id))
            .map(|e| e.action);

        let event = AttendanceEvent {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            employee_id,
            occurred_at: at,
            action: AttendanceAction::next_after(last_today),
            device_id,
        };
        events.push(event.clone());
        Ok(event)
    }

    async fn events_on(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AppError> {
        let entry = self.entry(employee_id);
        let events = lock(&entry);
        let mut today: Vec<AttendanceEvent> = events
            .iter()
            .filter(|e| e.occurred_at.date() == day)
            .cloned()
            .collect();
        today.sort_by_key(|e| (e.occurred_at, e.id));
        Ok(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[actix_web::test]
    async fn alternates_within_a_day() {
        let ledger = MemoryLedger::new();

        let a = ledger.record(1, 9, at(2, 8, 0)).await.unwrap();
        let b = ledger.record(1, 9, at(2, 12, 0)).await.unwrap();
        let c = ledger.record(1, 9, at(2, 13, 0)).await.unwrap();

        assert_eq!(a.action, AttendanceAction::CheckIn);
        assert_eq!(b.action, AttendanceAction::CheckOut);
        assert_eq!(c.action, AttendanceAction::CheckIn);
        assert_eq!(c.device_id, 9);
    }

    #[actix_web::test]
    async fn new_day_starts_with_check_in() {
        let ledger = MemoryLedger::new();

        ledger.record(1, 1, at(2, 8, 0)).await.unwrap();
        let next_day = ledger.record(1, 1, at(3, 8, 0)).await.unwrap();

        assert_eq!(next_day.action, AttendanceAction::CheckIn);
        assert_eq!(ledger.events_on(1, at(2, 0, 0).date()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn employees_are_independent() {
        let ledger = MemoryLedger::new();

        ledger.record(1, 1, at(2, 8, 0)).await.unwrap();
        let other = ledger.record(2, 1, at(2, 8, 5)).await.unwrap();

        assert_eq!(other.action, AttendanceAction::CheckIn);
    }

    #[test]
    fn concurrent_records_for_one_employee_never_double_check_in() {
        let ledger = Arc::new(MemoryLedger::new());
        let moment = at(4, 9, 0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                let ledger = ledger.clone();
                s.spawn(move || {
                    for _ in 0..25 {
                        futures::executor::block_on(ledger.record(7, 1, moment)).unwrap();
                    }
                });
            }
        });

        let events = futures::executor::block_on(ledger.events_on(7, moment.date())).unwrap();
        assert_eq!(events.len(), 200);
        for pair in events.windows(2) {
            assert_ne!(pair[0].action, pair[1].action, "two identical actions in a row");
        }
        assert_eq!(events[0].action, AttendanceAction::CheckIn);
    }
}

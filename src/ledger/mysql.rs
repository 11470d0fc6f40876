use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;

use super::{AttendanceLedger, day_bounds};
use crate::error::AppError;
use crate::model::attendance::{AttendanceAction, AttendanceEvent, AttendanceEventRow};

/// Ledger backed by the `attendance_events` table.
///
/// `record` locks the employee row (`SELECT ... FOR UPDATE`) for the duration
/// of its transaction, so concurrent identifications of the same employee
/// are applied one after another.
#[derive(Clone)]
pub struct MySqlLedger {
    pool: MySqlPool,
}

impl MySqlLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse_action(raw: &str) -> Result<AttendanceAction, AppError> {
    raw.parse()
        .map_err(|_| AppError::Internal(format!("unknown attendance action '{raw}' in storage")))
}

#[async_trait]
impl AttendanceLedger for MySqlLedger {
    async fn record(
        &self,
        employee_id: u64,
        device_id: u64,
        at: NaiveDateTime,
    ) -> Result<AttendanceEvent, AppError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("Employee not found".into()));
        }

        let (start, end) = day_bounds(at.date());
        let last_today = sqlx::query_scalar::<_, String>(
            r#"
            SELECT action
            FROM attendance_events
            WHERE employee_id = ?
              AND occurred_at >= ?
              AND occurred_at < ?
            ORDER BY occurred_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&mut *tx)
        .await?
        .map(|raw| parse_action(&raw))
        .transpose()?;

        let action = AttendanceAction::next_after(last_today);

        let result = sqlx::query(
            r#"
            INSERT INTO attendance_events (employee_id, occurred_at, action, device_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(at)
        .bind(action.as_ref())
        .bind(device_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(employee_id, device_id, %action, "attendance recorded");

        Ok(AttendanceEvent {
            id: result.last_insert_id(),
            employee_id,
            occurred_at: at,
            action,
            device_id,
        })
    }

    async fn events_on(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, AppError> {
        let (start, end) = day_bounds(day);
        let rows = sqlx::query_as::<_, AttendanceEventRow>(
            r#"
            SELECT id, employee_id, occurred_at, action, device_id
            FROM attendance_events
            WHERE employee_id = ?
              AND occurred_at >= ?
              AND occurred_at < ?
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let raw = row.action.clone();
                AttendanceEvent::try_from(row).map_err(|_| {
                    AppError::Internal(format!("unknown attendance action '{raw}' in storage"))
                })
            })
            .collect()
    }
}

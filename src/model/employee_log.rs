use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::MySqlConnection;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EmployeeEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeLog {
    #[schema(example = 77)]
    pub id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "UPDATE")]
    pub event: String,
    /// Database account that performed the change.
    #[schema(example = "attendance@10.0.0.5")]
    pub db_user: String,
    #[schema(example = "192.168.1.20", nullable = true)]
    pub ip: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub detail: Option<sqlx::types::JsonValue>,
    #[schema(example = "2026-03-02T10:00:00", value_type = String, format = "date-time")]
    pub logged_at: NaiveDateTime,
}

/// Appends an audit row inside the caller's transaction.
pub async fn append(
    conn: &mut MySqlConnection,
    employee_id: u64,
    event: EmployeeEvent,
    ip: Option<&str>,
    detail: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO employee_logs (employee_id, event, db_user, ip, detail)
        VALUES (?, ?, CURRENT_USER(), ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(event.as_ref())
    .bind(ip)
    .bind(sqlx::types::Json(detail))
    .execute(conn)
    .await?;

    Ok(())
}

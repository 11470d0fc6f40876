use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
}

impl AttendanceAction {
    /// Daily two-state toggle: nothing yet today or last was a check-out
    /// means the next event is a check-in, otherwise a check-out.
    pub fn next_after(last_today: Option<AttendanceAction>) -> AttendanceAction {
        match last_today {
            None | Some(AttendanceAction::CheckOut) => AttendanceAction::CheckIn,
            Some(AttendanceAction::CheckIn) => AttendanceAction::CheckOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceEvent {
    #[schema(example = 981)]
    pub id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "2026-03-02T08:01:44", format = "date-time", value_type = String)]
    pub occurred_at: NaiveDateTime,
    pub action: AttendanceAction,
    #[schema(example = 1)]
    pub device_id: u64,
}

/// Row shape; `action` is stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceEventRow {
    pub id: u64,
    pub employee_id: u64,
    pub occurred_at: NaiveDateTime,
    pub action: String,
    pub device_id: u64,
}

impl TryFrom<AttendanceEventRow> for AttendanceEvent {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            occurred_at: row.occurred_at,
            action: row.action.parse()?,
            device_id: row.device_id,
        })
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentKind {
    Late,
    EarlyLeave,
    Absence,
    Other,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Incident {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = 981)]
    pub attendance_id: u64,
    #[schema(example = "late")]
    pub kind: String,
    #[schema(example = "Llego 25 minutos tarde por bloqueo")]
    pub description: String,
    #[schema(example = "2026-03-02T10:00:00", value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Circular geofence of a branch; at most one per branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Zone {
    #[schema(example = 1)]
    pub branch_id: u64,
    #[schema(example = "Entrada principal")]
    pub name: String,
    #[schema(example = json!(-16.5))]
    pub latitude: f64,
    #[schema(example = json!(-68.15))]
    pub longitude: f64,
    #[schema(example = 100.0)]
    pub radius_m: f64,
    #[schema(example = "2026-01-01T00:00:00", value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

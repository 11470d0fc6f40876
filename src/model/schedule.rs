use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Schedule {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    /// 1 = Monday ... 7 = Sunday.
    #[schema(example = 1)]
    pub day_of_week: u8,
    #[schema(example = "08:00:00", value_type = String)]
    pub entry_time: NaiveTime,
    #[schema(example = "16:00:00", value_type = String)]
    pub exit_time: NaiveTime,
    #[schema(example = 10)]
    pub tolerance_minutes: u32,
}

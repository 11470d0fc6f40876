use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 12,
        "ci": "4876512",
        "name": "Ana",
        "surname": "Quispe",
        "role_id": 1,
        "department_id": 2,
        "hire_date": "2024-01-15",
        "photo_url": "uploads/4876512.jpg",
        "created_at": "2024-01-15T09:12:00"
    })
)]
pub struct Employee {
    #[schema(example = 12)]
    pub id: u64,

    /// National identity card number.
    #[schema(example = "4876512")]
    pub ci: String,

    #[schema(example = "Ana")]
    pub name: String,

    #[schema(example = "Quispe")]
    pub surname: String,

    #[schema(example = 1, nullable = true)]
    pub role_id: Option<u64>,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "2024-01-15", value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,

    #[schema(example = "uploads/4876512.jpg", nullable = true)]
    pub photo_url: Option<String>,

    #[schema(example = "2024-01-15T09:12:00", value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

/// Short form returned by identification.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeSummary {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "4876512")]
    pub ci: String,
    #[schema(example = "Ana")]
    pub name: String,
    #[schema(example = "Quispe")]
    pub surname: String,
}

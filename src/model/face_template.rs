use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::recognition::{Embedding, EmbeddingError, StoredTemplate};

/// Raw row; the JSON vector is validated when converted to [`StoredTemplate`].
#[derive(Debug, sqlx::FromRow)]
pub struct FaceTemplateRow {
    pub id: u64,
    pub employee_id: u64,
    pub embedding: Json<Vec<f32>>,
}

impl TryFrom<FaceTemplateRow> for StoredTemplate {
    type Error = EmbeddingError;

    fn try_from(row: FaceTemplateRow) -> Result<Self, Self::Error> {
        Ok(StoredTemplate {
            template_id: row.id,
            employee_id: row.employee_id,
            embedding: Embedding::try_from(row.embedding.0)?,
        })
    }
}

/// Template metadata without the vector.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct FaceTemplateInfo {
    #[schema(example = 40)]
    pub id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "uploads/4876512.jpg", nullable = true)]
    pub image_ref: Option<String>,
    #[schema(example = "2026-01-15T09:12:00", value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

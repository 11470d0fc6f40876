use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Contabilidad")]
    pub name: String,
}

/// Job role catalog entry (distinct from the access [`Role`](super::role::Role)).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct JobRole {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Cajero")]
    pub name: String,
}

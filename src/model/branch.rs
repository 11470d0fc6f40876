use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Branch {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Sucursal Centro")]
    pub name: String,
    #[schema(example = "Av. Camacho 1234", nullable = true)]
    pub address: Option<String>,
}

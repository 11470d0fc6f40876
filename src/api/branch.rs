use crate::{auth::auth::AuthUser, error::AppError, model::branch::Branch};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBranch {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[schema(example = "Sucursal Centro")]
    pub name: String,
    #[validate(length(max = 255, message = "Address too long"))]
    #[schema(example = "Av. Camacho 1234", nullable = true)]
    pub address: Option<String>,
}

/// List branches
#[utoipa::path(
    get,
    path = "/api/branches",
    responses((status = 200, description = "All branches", body = Vec<Branch>)),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn list_branches(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let branches =
        sqlx::query_as::<_, Branch>("SELECT id, name, address FROM branches ORDER BY name")
            .fetch_all(pool.get_ref())
            .await?;

    Ok(HttpResponse::Ok().json(branches))
}

/// Create a branch
#[utoipa::path(
    post,
    path = "/api/branches",
    request_body = CreateBranch,
    responses(
        (status = 201, description = "Branch created", body = Branch),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn create_branch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateBranch>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let name = payload.name.trim().to_string();
    let address = payload
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let result = sqlx::query("INSERT INTO branches (name, address) VALUES (?, ?)")
        .bind(&name)
        .bind(address.as_deref())
        .execute(pool.get_ref())
        .await?;

    let branch = Branch {
        id: result.last_insert_id(),
        name,
        address,
    };
    info!(branch_id = branch.id, "Branch created");

    Ok(HttpResponse::Created().json(branch))
}

/// Delete a branch and its zone
#[utoipa::path(
    delete,
    path = "/api/branches/{branch_id}",
    params(("branch_id", Path, description = "Branch ID")),
    responses(
        (status = 200, description = "Branch deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Branch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn delete_branch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let branch_id = path.into_inner();

    let result = sqlx::query("DELETE FROM branches WHERE id = ?")
        .bind(branch_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Branch not found".into()));
    }

    info!(branch_id, "Branch deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

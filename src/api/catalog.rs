use crate::{
    error::AppError,
    model::department::{Department, JobRole},
};
use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;

/// Departments catalog
#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, description = "All departments", body = Vec<Department>)),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn list_departments(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let departments =
        sqlx::query_as::<_, Department>("SELECT id, name FROM departments ORDER BY name")
            .fetch_all(pool.get_ref())
            .await?;

    Ok(HttpResponse::Ok().json(departments))
}

/// Job roles catalog
#[utoipa::path(
    get,
    path = "/api/roles",
    responses((status = 200, description = "All job roles", body = Vec<JobRole>)),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn list_roles(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let roles = sqlx::query_as::<_, JobRole>("SELECT id, name FROM roles ORDER BY name")
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(roles))
}

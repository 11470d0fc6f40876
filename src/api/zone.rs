use crate::{auth::auth::AuthUser, error::AppError, model::zone::Zone};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ZoneQuery {
    pub branch_id: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveZone {
    #[schema(example = 1)]
    pub branch_id: u64,
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[schema(example = "Entrada principal")]
    pub name: String,
    #[validate(custom(function = "crate::utils::validation::validate_latitude"))]
    #[schema(example = json!(-16.5))]
    pub latitude: f64,
    #[validate(custom(function = "crate::utils::validation::validate_longitude"))]
    #[schema(example = json!(-68.15))]
    pub longitude: f64,
    #[validate(custom(function = "crate::utils::validation::validate_radius"))]
    #[schema(example = 100.0)]
    pub radius_m: f64,
}

async fn fetch_zone(pool: &MySqlPool, branch_id: u64) -> Result<Option<Zone>, AppError> {
    Ok(sqlx::query_as::<_, Zone>(
        r#"
        SELECT branch_id, name, latitude, longitude, radius_m, updated_at
        FROM zones
        WHERE branch_id = ?
        "#,
    )
    .bind(branch_id)
    .fetch_optional(pool)
    .await?)
}

/// Read a branch's zone
#[utoipa::path(
    get,
    path = "/api/zone",
    params(ZoneQuery),
    responses(
        (status = 200, description = "Zone of the branch", body = Zone),
        (status = 404, description = "Branch has no zone")
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn get_zone(
    pool: web::Data<MySqlPool>,
    query: web::Query<ZoneQuery>,
) -> Result<HttpResponse, AppError> {
    let zone = fetch_zone(pool.get_ref(), query.branch_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Zone not configured for this branch".into()))?;

    Ok(HttpResponse::Ok().json(zone))
}

/// Create or replace a branch's zone
#[utoipa::path(
    post,
    path = "/api/zone",
    request_body = SaveZone,
    responses(
        (status = 200, description = "Zone saved", body = Zone),
        (status = 400, description = "Coordinate or radius out of range"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Branch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn save_zone(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SaveZone>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let branch = sqlx::query_scalar::<_, u64>("SELECT id FROM branches WHERE id = ?")
        .bind(payload.branch_id)
        .fetch_optional(pool.get_ref())
        .await?;
    if branch.is_none() {
        return Err(AppError::NotFound("Branch not found".into()));
    }

    sqlx::query(
        r#"
        INSERT INTO zones (branch_id, name, latitude, longitude, radius_m)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            name = VALUES(name),
            latitude = VALUES(latitude),
            longitude = VALUES(longitude),
            radius_m = VALUES(radius_m)
        "#,
    )
    .bind(payload.branch_id)
    .bind(payload.name.trim())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_m)
    .execute(pool.get_ref())
    .await?;

    info!(
        branch_id = payload.branch_id,
        radius_m = payload.radius_m,
        "Zone saved"
    );

    let zone = fetch_zone(pool.get_ref(), payload.branch_id)
        .await?
        .ok_or_else(|| AppError::Internal("saved zone vanished".into()))?;
    Ok(HttpResponse::Ok().json(zone))
}

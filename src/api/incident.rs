use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::incident::{Incident, IncidentKind},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIncident {
    #[schema(example = 981)]
    pub attendance_id: u64,
    pub kind: IncidentKind,
    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    #[schema(example = "Llego 25 minutos tarde por bloqueo")]
    pub description: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncidentQuery {
    pub attendance_id: u64,
}

/// Record an incident against an attendance event
#[utoipa::path(
    post,
    path = "/api/incidents",
    request_body = CreateIncident,
    responses(
        (status = 201, description = "Incident recorded", body = Incident),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 404, description = "Attendance event not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Incident"
)]
pub async fn create_incident(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateIncident>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;
    payload.validate()?;

    let event = sqlx::query_scalar::<_, u64>("SELECT id FROM attendance_events WHERE id = ?")
        .bind(payload.attendance_id)
        .fetch_optional(pool.get_ref())
        .await?;
    if event.is_none() {
        return Err(AppError::NotFound("Attendance event not found".into()));
    }

    let result = sqlx::query(
        "INSERT INTO incidents (attendance_id, kind, description) VALUES (?, ?, ?)",
    )
    .bind(payload.attendance_id)
    .bind(payload.kind.as_ref())
    .bind(payload.description.trim())
    .execute(pool.get_ref())
    .await?;

    let incident = sqlx::query_as::<_, Incident>(
        "SELECT id, attendance_id, kind, description, created_at FROM incidents WHERE id = ?",
    )
    .bind(result.last_insert_id())
    .fetch_one(pool.get_ref())
    .await?;

    info!(
        incident_id = incident.id,
        attendance_id = incident.attendance_id,
        kind = %incident.kind,
        "Incident recorded"
    );
    Ok(HttpResponse::Created().json(incident))
}

/// List incidents of an attendance event
#[utoipa::path(
    get,
    path = "/api/incidents",
    params(IncidentQuery),
    responses((status = 200, description = "Incidents, oldest first", body = Vec<Incident>)),
    security(("bearer_auth" = [])),
    tag = "Incident"
)]
pub async fn list_incidents(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<IncidentQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;

    let incidents = sqlx::query_as::<_, Incident>(
        r#"
        SELECT id, attendance_id, kind, description, created_at
        FROM incidents
        WHERE attendance_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(query.attendance_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(incidents))
}

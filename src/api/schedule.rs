use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::schedule::Schedule,
    utils::validation::validate_shift,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_schedule_shift"))]
pub struct CreateSchedule {
    #[schema(example = 12)]
    pub employee_id: u64,
    /// 1 = Monday ... 7 = Sunday.
    #[validate(custom(function = "crate::utils::validation::validate_day_of_week"))]
    #[schema(example = 1)]
    pub day_of_week: u8,
    #[schema(example = "08:00:00", value_type = String)]
    pub entry_time: NaiveTime,
    #[schema(example = "16:00:00", value_type = String)]
    pub exit_time: NaiveTime,
    #[serde(default)]
    #[validate(custom(function = "crate::utils::validation::validate_tolerance"))]
    #[schema(example = 10)]
    pub tolerance_minutes: u32,
}

fn validate_schedule_shift(schedule: &CreateSchedule) -> Result<(), ValidationError> {
    validate_shift(schedule.entry_time, schedule.exit_time)
}

/// Create a schedule entry
///
/// One entry per employee and weekday; a second one for the same day is a
/// conflict.
#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body = CreateSchedule,
    responses(
        (status = 201, description = "Schedule created", body = Schedule),
        (status = 400, description = "Invalid day, times or tolerance"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 409, description = "Day already scheduled or employee missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSchedule>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO schedules
        (employee_id, day_of_week, entry_time, exit_time, tolerance_minutes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.day_of_week)
    .bind(payload.entry_time)
    .bind(payload.exit_time)
    .bind(payload.tolerance_minutes)
    .execute(pool.get_ref())
    .await?;

    let schedule = Schedule {
        id: result.last_insert_id(),
        employee_id: payload.employee_id,
        day_of_week: payload.day_of_week,
        entry_time: payload.entry_time,
        exit_time: payload.exit_time,
        tolerance_minutes: payload.tolerance_minutes,
    };

    info!(
        schedule_id = schedule.id,
        employee_id = schedule.employee_id,
        day_of_week = schedule.day_of_week,
        "Schedule created"
    );
    Ok(HttpResponse::Created().json(schedule))
}

/// List an employee's schedule
#[utoipa::path(
    get,
    path = "/api/schedules/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses((status = 200, description = "Weekly schedule, Monday first", body = Vec<Schedule>)),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn list_employee_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    if auth.employee_id != Some(employee_id) {
        auth.require_supervisor_or_admin()?;
    }

    let schedules = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, employee_id, day_of_week, entry_time, exit_time, tolerance_minutes
        FROM schedules
        WHERE employee_id = ?
        ORDER BY day_of_week
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(schedules))
}

/// Delete a schedule entry
#[utoipa::path(
    delete,
    path = "/api/schedules/{schedule_id}",
    params(("schedule_id", Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Schedule deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn delete_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;
    let schedule_id = path.into_inner();

    let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(schedule_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Schedule not found".into()));
    }

    info!(schedule_id, "Schedule deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

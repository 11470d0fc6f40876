use crate::{auth::auth::AuthUser, error::AppError, model::employee_log::EmployeeLog};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

const DEFAULT_LIMIT: u32 = 200;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Rows to return, newest first (default 200, at most 1000).
    pub limit: Option<u32>,
}

fn effective_limit(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Employee audit log
#[utoipa::path(
    get,
    path = "/api/logs/employees",
    params(LogQuery),
    responses(
        (status = 200, description = "Audit rows, newest first", body = Vec<EmployeeLog>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Audit"
)]
pub async fn list_employee_logs(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let logs = sqlx::query_as::<_, EmployeeLog>(
        r#"
        SELECT id, employee_id, event, db_user, ip, detail, logged_at
        FROM employee_logs
        ORDER BY logged_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(effective_limit(query.limit))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(logs))
}

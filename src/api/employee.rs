use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{
        employee::Employee,
        employee_log::{self, EmployeeEvent},
    },
    utils::{
        ci_filter, client_ip,
        db_utils::{ColumnKind, SqlValue, build_update_sql, execute_update},
        template_cache::TemplateCache,
    },
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const EMPLOYEE_COLUMNS: &str =
    "id, ci, name, surname, role_id, department_id, hire_date, photo_url, created_at";

/// Columns a partial update may touch.
const UPDATABLE: &[(&str, ColumnKind)] = &[
    ("ci", ColumnKind::Text),
    ("name", ColumnKind::Text),
    ("surname", ColumnKind::Text),
    ("role_id", ColumnKind::OptionalId),
    ("department_id", ColumnKind::OptionalId),
    ("hire_date", ColumnKind::OptionalDate),
    ("photo_url", ColumnKind::OptionalText),
];

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateEmployee {
    #[validate(length(min = 4, max = 32, message = "CI must be 4-32 characters"))]
    #[schema(example = "4876512")]
    pub ci: String,
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "Ana")]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "Quispe")]
    pub surname: String,
    #[schema(example = 1, nullable = true)]
    pub role_id: Option<u64>,
    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
    #[validate(length(max = 512))]
    #[schema(example = "uploads/4876512.jpg", nullable = true)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub role_id: Option<u64>,
    /// Matches CI, name or surname.
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

/// Normalized page, page size and row offset of a list request.
fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    let offset = u64::from(page - 1) * u64::from(per_page);
    (page, per_page, offset)
}

/// Stored form of a CI: separators stripped, letters uppercased.
fn canonical_ci(raw: &str) -> Result<String, AppError> {
    let ci = ci_filter::normalize(raw);
    if ci.chars().count() < 4 {
        return Err(AppError::Validation(
            "ci: CI must have at least 4 characters besides separators".into(),
        ));
    }
    Ok(ci)
}

/// Rewrites a string `ci` in an update body to its stored form. Other value
/// types are left for the update builder to reject.
fn canonicalize_ci_field(body: &mut Value) -> Result<(), AppError> {
    if let Some(field) = body.get_mut("ci") {
        if let Some(raw) = field.as_str() {
            *field = Value::String(canonical_ci(raw)?);
        }
    }
    Ok(())
}

async fn fetch_employee(pool: &MySqlPool, id: u64) -> Result<Option<Employee>, AppError> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    Ok(sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 409, description = "CI already registered")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;
    payload.validate()?;

    let ci = canonical_ci(&payload.ci)?;
    if ci_filter::might_exist(&ci) {
        // the filter can only say "maybe", confirm with the database
        let taken = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE ci = ?")
            .bind(&ci)
            .fetch_optional(pool.get_ref())
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("CI already registered".into()));
        }
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (ci, name, surname, role_id, department_id, hire_date, photo_url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&ci)
    .bind(payload.name.trim())
    .bind(payload.surname.trim())
    .bind(payload.role_id)
    .bind(payload.department_id)
    .bind(payload.hire_date)
    .bind(payload.photo_url.as_deref())
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_id();
    let ip = client_ip(&req);
    employee_log::append(
        &mut tx,
        id,
        EmployeeEvent::Insert,
        ip.as_deref(),
        &serde_json::to_value(&*payload).unwrap_or(Value::Null),
    )
    .await?;

    tx.commit().await?;
    ci_filter::insert(&ci);

    info!(employee_id = id, by = %auth.username, "Employee created");

    let employee = fetch_employee(pool.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::Internal("created employee vanished".into()))?;
    Ok(HttpResponse::Created().json(employee))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(SqlValue::U64(department_id));
    }

    if let Some(role_id) = query.role_id {
        conditions.push("role_id = ?");
        bindings.push(SqlValue::U64(role_id));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(ci LIKE ? OR name LIKE ? OR surname LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            SqlValue::U64(v) => count_query.bind(*v),
            SqlValue::String(v) => count_query.bind(v.as_str()),
            SqlValue::Date(v) => count_query.bind(*v),
            SqlValue::Null => count_query.bind(None::<String>),
        };
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = match b {
            SqlValue::U64(v) => data_query.bind(*v),
            SqlValue::String(v) => data_query.bind(v.as_str()),
            SqlValue::Date(v) => data_query.bind(*v),
            SqlValue::Null => data_query.bind(None::<String>),
        };
    }
    let employees = data_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();

    // employees may read their own record
    if auth.employee_id != Some(employee_id) {
        auth.require_supervisor_or_admin()?;
    }

    let employee = fetch_employee(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body(
        content = Object,
        description = "Columns to change: ci, name, surname, role_id, department_id, hire_date, photo_url",
        example = json!({ "surname": "Quispe Mamani", "department_id": 3 })
    ),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Unknown or mistyped field"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "CI already registered")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;
    let employee_id = path.into_inner();
    let mut body = body.into_inner();
    canonicalize_ci_field(&mut body)?;

    let update = build_update_sql("employees", &body, UPDATABLE, "id", employee_id)?;

    let mut tx = pool.begin().await?;

    let previous_ci = sqlx::query_scalar::<_, String>("SELECT ci FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

    execute_update(&mut *tx, &update).await?;

    let ip = client_ip(&req);
    employee_log::append(
        &mut tx,
        employee_id,
        EmployeeEvent::Update,
        ip.as_deref(),
        &json!({ "changes": &body }),
    )
    .await?;

    tx.commit().await?;

    if let Some(new_ci) = body.get("ci").and_then(Value::as_str) {
        ci_filter::remove(&previous_ci);
        ci_filter::insert(new_ci);
    }

    info!(employee_id, columns = ?update.columns, "Employee updated");

    let employee = fetch_employee(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
///
/// Removes the employee together with templates, attendance and schedules.
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    cache: web::Data<TemplateCache>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let employee = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ? FOR UPDATE"
    ))
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

    let ip = client_ip(&req);
    employee_log::append(
        &mut tx,
        employee_id,
        EmployeeEvent::Delete,
        ip.as_deref(),
        &serde_json::to_value(&employee).unwrap_or(Value::Null),
    )
    .await?;

    tx.commit().await?;

    ci_filter::remove(&employee.ci);
    cache.invalidate().await;

    info!(employee_id, by = %auth.username, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    ledger::AttendanceLedger,
    model::{
        attendance::AttendanceAction,
        employee::EmployeeSummary,
        face_template::FaceTemplateInfo,
    },
    recognition::{
        Candidate, Confidence, Embedding, RejectReason, TemplateMatcher, average_round,
    },
    utils::template_cache::TemplateCache,
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Upper bound on capture rounds accepted per identification.
const MAX_ROUNDS: usize = 5;

#[derive(Debug, Deserialize, ToSchema)]
pub struct IdentifyRequest {
    /// One averaged descriptor per capture round.
    #[serde(default)]
    #[schema(value_type = Vec<Vec<f32>>)]
    pub embeddings: Vec<Vec<f32>>,
    /// Raw per-sample descriptors grouped by round; `null` marks a sample
    /// without a detected face. Averaged here when `embeddings` is empty.
    #[serde(default)]
    #[schema(value_type = Vec<Vec<Option<Vec<f32>>>>)]
    pub samples: Vec<Vec<Option<Vec<f32>>>>,
    #[schema(example = 1)]
    pub device_id: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentifyResponse {
    pub identified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<AttendanceAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_id: Option<u64>,
    #[schema(example = 0.31, nullable = true)]
    pub score: Option<f32>,
    #[schema(value_type = String, example = "medium")]
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "above_threshold")]
    pub reason: Option<RejectReason>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollTemplate {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(value_type = Vec<f32>)]
    pub embedding: Vec<f32>,
    #[schema(example = "uploads/4876512.jpg", nullable = true)]
    pub image_ref: Option<String>,
}

/// Turns the request body into one validated query per round.
fn query_embeddings(req: &IdentifyRequest) -> Result<Vec<Embedding>, AppError> {
    match (req.embeddings.is_empty(), req.samples.is_empty()) {
        (true, true) => Err(AppError::Validation(
            "Either embeddings or samples must be provided".into(),
        )),
        (false, false) => Err(AppError::Validation(
            "Provide embeddings or samples, not both".into(),
        )),
        (false, true) => {
            if req.embeddings.len() > MAX_ROUNDS {
                return Err(AppError::Validation(format!("At most {MAX_ROUNDS} rounds allowed")));
            }
            req.embeddings
                .iter()
                .map(|values| Embedding::try_from(values.clone()).map_err(AppError::from))
                .collect()
        }
        (true, false) => {
            if req.samples.len() > MAX_ROUNDS {
                return Err(AppError::Validation(format!("At most {MAX_ROUNDS} rounds allowed")));
            }
            req.samples
                .iter()
                .map(|round| average_round(round).map_err(AppError::from))
                .collect()
        }
    }
}

/// Identify an employee from face descriptors
///
/// A rejected match is a normal answer (`identified = false`); only a
/// malformed request or a round without any face is an error.
#[utoipa::path(
    post,
    path = "/api/templates/identify",
    request_body = IdentifyRequest,
    responses(
        (status = 200, description = "Match decision with ranked candidates", body = IdentifyResponse),
        (status = 400, description = "Malformed embeddings"),
        (status = 403, description = "Role may not identify"),
        (status = 422, description = "No face detected in a round")
    ),
    security(("bearer_auth" = [])),
    tag = "Recognition"
)]
#[instrument(name = "identify", skip_all, fields(device_id = body.device_id))]
pub async fn identify(
    auth: AuthUser,
    body: web::Json<IdentifyRequest>,
    pool: web::Data<MySqlPool>,
    cache: web::Data<TemplateCache>,
    matcher: web::Data<TemplateMatcher>,
    ledger: web::Data<dyn AttendanceLedger>,
) -> Result<HttpResponse, AppError> {
    auth.require_identify_access()?;

    let queries = query_embeddings(&body)?;
    let templates = cache.get_or_load(pool.get_ref()).await?;
    let decision = matcher.identify(&queries, &templates);

    debug!(
        rounds = queries.len(),
        templates = templates.len(),
        threshold = matcher.threshold(),
        score = ?decision.score,
        "Match evaluated"
    );

    let Some(matched) = decision.matched else {
        info!(reason = ?decision.reason, "No employee identified");
        return Ok(HttpResponse::Ok().json(IdentifyResponse {
            identified: false,
            employee: None,
            action: None,
            attendance_id: None,
            score: decision.score,
            confidence: decision.confidence,
            reason: decision.reason,
            candidates: decision.candidates,
        }));
    };

    // The event is the last write; a failure after it would invite a retry
    // that toggles the employee again.
    let employee = sqlx::query_as::<_, EmployeeSummary>(
        "SELECT id, ci, name, surname FROM employees WHERE id = ?",
    )
    .bind(matched.employee_id)
    .fetch_optional(pool.get_ref())
    .await?;

    let now = chrono::Local::now().naive_local();
    let event = ledger
        .record(matched.employee_id, body.device_id, now)
        .await?;

    info!(
        employee_id = matched.employee_id,
        template_id = matched.template_id,
        action = %event.action,
        "Employee identified"
    );

    Ok(HttpResponse::Ok().json(IdentifyResponse {
        identified: true,
        employee,
        action: Some(event.action),
        attendance_id: Some(event.id),
        score: decision.score,
        confidence: decision.confidence,
        reason: None,
        candidates: decision.candidates,
    }))
}

/// Enroll a face template
#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = EnrollTemplate,
    responses(
        (status = 201, description = "Template stored", body = Object, example = json!({"id": 40})),
        (status = 400, description = "Embedding has the wrong dimension or non-finite values"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Recognition"
)]
pub async fn enroll_template(
    auth: AuthUser,
    body: web::Json<EnrollTemplate>,
    pool: web::Data<MySqlPool>,
    cache: web::Data<TemplateCache>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;

    let body = body.into_inner();
    let embedding = Embedding::try_from(body.embedding)?;

    let exists = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ?")
        .bind(body.employee_id)
        .fetch_optional(pool.get_ref())
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Employee not found".into()));
    }

    let result = sqlx::query(
        "INSERT INTO face_templates (employee_id, embedding, image_ref) VALUES (?, ?, ?)",
    )
    .bind(body.employee_id)
    .bind(sqlx::types::Json(embedding.values()))
    .bind(body.image_ref.as_deref())
    .execute(pool.get_ref())
    .await?;

    cache.invalidate().await;

    let id = result.last_insert_id();
    info!(template_id = id, employee_id = body.employee_id, "Face template enrolled");
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}

/// List an employee's templates (metadata only)
#[utoipa::path(
    get,
    path = "/api/templates/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Templates of the employee", body = Vec<FaceTemplateInfo>),
        (status = 403, description = "Supervisor/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Recognition"
)]
pub async fn list_employee_templates(
    auth: AuthUser,
    path: web::Path<u64>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require_supervisor_or_admin()?;

    let templates = sqlx::query_as::<_, FaceTemplateInfo>(
        r#"
        SELECT id, employee_id, image_ref, created_at
        FROM face_templates
        WHERE employee_id = ?
        ORDER BY id
        "#,
    )
    .bind(path.into_inner())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(templates))
}

use crate::{auth::auth::AuthUser, error::AppError, ledger::AttendanceLedger};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    pub employee_id: u64,
    /// Calendar day (YYYY-MM-DD); today when omitted.
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

/// Attendance events of one employee for one day
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Events, oldest first", body = Vec<crate::model::attendance::AttendanceEvent>),
        (status = 403, description = "Only the employee or a supervisor may read this")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    ledger: web::Data<dyn AttendanceLedger>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    if auth.employee_id != Some(query.employee_id) {
        auth.require_supervisor_or_admin()?;
    }

    let day = query
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let events = ledger.events_on(query.employee_id, day).await?;

    Ok(HttpResponse::Ok().json(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token};
    use crate::config::tests::test_config;
    use crate::ledger::MemoryLedger;
    use actix_web::{App, http::StatusCode, test, web::Data};
    use std::sync::Arc;

    fn bearer(role: u8, employee_id: Option<u64>, secret: &str) -> String {
        let subject = TokenSubject {
            user_id: 1,
            username: "tester",
            role,
            employee_id,
        };
        let token = generate_access_token(&subject, secret, 60).unwrap();
        format!("Bearer {token}")
    }

    #[actix_web::test]
    async fn supervisor_reads_any_employee_day() {
        let config = test_config();
        let ledger = Arc::new(MemoryLedger::new());
        let morning = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        ledger.record(12, 1, morning).await.unwrap();
        ledger
            .record(12, 1, morning + chrono::Duration::hours(8))
            .await
            .unwrap();

        let shared: Arc<dyn AttendanceLedger> = ledger;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::from(shared))
                .route("/attendance", web::get().to(list_attendance)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/attendance?employee_id=12&date=2026-03-02")
            .insert_header(("Authorization", bearer(2, None, &config.jwt_secret)))
            .to_request();

        let events: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["action"], "check_in");
        assert_eq!(events[1]["action"], "check_out");
    }

    #[actix_web::test]
    async fn employee_reads_only_own_days() {
        let config = test_config();
        let shared: Arc<dyn AttendanceLedger> = Arc::new(MemoryLedger::new());
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::from(shared))
                .route("/attendance", web::get().to(list_attendance)),
        )
        .await;

        let other = test::TestRequest::get()
            .uri("/attendance?employee_id=12&date=2026-03-02")
            .insert_header(("Authorization", bearer(3, Some(7), &config.jwt_secret)))
            .to_request();
        assert_eq!(test::call_service(&app, other).await.status(), StatusCode::FORBIDDEN);

        let own = test::TestRequest::get()
            .uri("/attendance?employee_id=7&date=2026-03-02")
            .insert_header(("Authorization", bearer(3, Some(7), &config.jwt_secret)))
            .to_request();
        assert_eq!(test::call_service(&app, own).await.status(), StatusCode::OK);
    }
}

use crate::{
    error::AppError,
    model::zone::Zone,
    recognition::{GeoPoint, geofence},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckinRequest {
    #[schema(example = 1)]
    pub branch_id: u64,
    #[schema(example = json!(-16.5003))]
    pub latitude: f64,
    #[schema(example = json!(-68.1501))]
    pub longitude: f64,
}

/// Check whether a device stands inside its branch's geofence
///
/// An unconfigured zone answers 409 instead of guessing.
#[utoipa::path(
    post,
    path = "/api/checkins",
    request_body = CheckinRequest,
    responses(
        (status = 200, description = "Geofence verdict", body = crate::recognition::GeofenceVerdict),
        (status = 400, description = "Malformed coordinate"),
        (status = 409, description = "Branch has no usable zone")
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn check_location(
    body: web::Json<CheckinRequest>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let device = GeoPoint::new(body.latitude, body.longitude)?;

    let zone = sqlx::query_as::<_, Zone>(
        r#"
        SELECT branch_id, name, latitude, longitude, radius_m, updated_at
        FROM zones
        WHERE branch_id = ?
        "#,
    )
    .bind(body.branch_id)
    .fetch_optional(pool.get_ref())
    .await?;

    let verdict = geofence::verify(body.branch_id, device, zone.as_ref())?;

    info!(
        branch_id = body.branch_id,
        inside = verdict.inside,
        distance_m = verdict.distance_m,
        "Geofence checked"
    );

    Ok(HttpResponse::Ok().json(verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use actix_web::{App, http::StatusCode, test as actix_test, web::Data};
    use sqlx::mysql::MySqlPoolOptions;
    use std::time::Duration;

    macro_rules! checkin_app {
        () => {{
            let config = test_config();
            let pool = MySqlPoolOptions::new()
                .acquire_timeout(Duration::from_millis(300))
                .connect_lazy(&config.database_url)
                .unwrap();
            actix_test::init_service(
                App::new()
                    .app_data(Data::new(pool))
                    .route("/checkins", web::post().to(check_location)),
            )
            .await
        }};
    }

    async fn status_for(body: &str) -> StatusCode {
        let app = checkin_app!();
        let req = actix_test::TestRequest::post()
            .uri("/checkins")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body.to_string())
            .to_request();
        actix_test::call_service(&app, req).await.status()
    }

    #[actix_web::test]
    async fn out_of_range_coordinates_are_rejected() {
        assert_eq!(
            status_for(r#"{"branch_id": 1, "latitude": 91.0, "longitude": -68.15}"#).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(r#"{"branch_id": 1, "latitude": -16.5, "longitude": -180.5}"#).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn malformed_or_overflowing_coordinates_are_rejected() {
        assert_eq!(
            status_for(r#"{"branch_id": 1, "latitude": "south", "longitude": -68.15}"#).await,
            StatusCode::BAD_REQUEST
        );
        // serde_json refuses numbers that would parse to infinity
        assert_eq!(
            status_for(r#"{"branch_id": 1, "latitude": 1e400, "longitude": -68.15}"#).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(r#"{"branch_id": 1, "latitude": -16.5}"#).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn valid_point_reaches_the_zone_lookup() {
        // validation passed; what follows depends on the database
        let status =
            status_for(r#"{"branch_id": 1, "latitude": -16.5, "longitude": -68.15}"#).await;
        assert_ne!(status, StatusCode::BAD_REQUEST);
    }
}

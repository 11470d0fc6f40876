use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("App config missing".into()))?;

    let header = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().unwrap_or_default());

    match AuthUser::from_bearer(header, &config) {
        Ok(auth_user) => {
            tracing::debug!(user_id = auth_user.user_id, role = ?auth_user.role, "authenticated");
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        Err(e) => {
            let resp = e.error_response();
            Ok(req.into_response(resp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};
    use crate::config::tests::test_config;
    use actix_web::middleware::from_fn;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    const SUBJECT: TokenSubject<'static> = TokenSubject {
        user_id: 1,
        username: "admin",
        role: 1,
        employee_id: None,
    };

    #[actix_web::test]
    async fn guards_protected_scope() {
        let config = test_config();
        let app = test::init_service(
            App::new().app_data(Data::new(config.clone())).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bad = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", "Token abc"))
            .to_request();
        assert_eq!(test::call_service(&app, bad).await.status(), StatusCode::UNAUTHORIZED);

        let (refresh, _) = generate_refresh_token(&SUBJECT, &config.jwt_secret, 60).unwrap();
        let with_refresh = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        assert_eq!(
            test::call_service(&app, with_refresh).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let access = generate_access_token(&SUBJECT, &config.jwt_secret, 60).unwrap();
        let ok = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_request();
        let resp = test::call_service(&app, ok).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "admin");
    }
}

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::{role::Role, user::User},
    models::{LoginReqDto, RegisterReq, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and stores the refresh token's `jti`.
async fn issue_pair(
    subject: &TokenSubject<'_>,
    pool: &MySqlPool,
    config: &Config,
) -> Result<TokenPair, AppError> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Register a user
///
/// The very first account becomes an admin without authentication. After
/// that, only an admin may create accounts.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully", "role_id": 4
        })),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Admin token required"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    caller: Option<AuthUser>,
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    user.validate()?;
    let username = user.username.trim().to_lowercase();
    let hashed = hash_password(&user.password)?;

    let mut tx = pool.begin().await?;

    let locked = sqlx::query_scalar::<_, u8>(
        "SELECT id FROM registration_lock WHERE id = 1 FOR UPDATE",
    )
    .fetch_optional(&mut *tx)
    .await?;
    if locked.is_none() {
        warn!("registration_lock row missing, first-admin bootstrap is not serialized");
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;

    let role = registration_role(existing, caller.as_ref(), user.role_id)?;
    if existing == 0 {
        info!(%username, "Bootstrapping first admin account");
    }

    let result = sqlx::query(
        r#"INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&username)
    .bind(hashed)
    .bind(role.id())
    .bind(user.employee_id)
    .execute(&mut *tx)
    .await;

    match result {
        Ok(_) => {
            tx.commit().await?;
            Ok(HttpResponse::Created().json(json!({
                "message": "User registered successfully",
                "role_id": role.id()
            })))
        }
        Err(e) => match AppError::from(e) {
            AppError::Conflict(_) => Err(AppError::Conflict("Username already taken".into())),
            other => Err(other),
        },
    }
}

/// Role of a new account: admin while no account exists, otherwise the
/// requested role, and only for an admin caller.
fn registration_role(
    existing_users: i64,
    caller: Option<&AuthUser>,
    requested: u8,
) -> Result<Role, AppError> {
    if existing_users == 0 {
        return Ok(Role::Admin);
    }
    let caller = caller.ok_or_else(|| AppError::Unauthorized("Admin token required".into()))?;
    caller.require_admin()?;
    Role::from_id(requested)
        .ok_or_else(|| AppError::Validation(format!("Unknown role id {requested}")))
}

/// Log in
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AppError::Validation("Username or password required".into()));
    }

    let username = user.username.trim().to_lowercase();

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await?;

    let db_user = match db_user {
        Some(u) if u.is_active => u,
        Some(_) => {
            info!("Login refused: account disabled");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(&user.password, &db_user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: &db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let pair = issue_pair(&subject, pool.get_ref(), config.get_ref()).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    let mut tx = pool.begin().await?;

    // revoke the presented token; a second use finds it already revoked
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
    )
    .bind(&claims.jti)
    .execute(&mut *tx)
    .await?;

    if revoked.rows_affected() == 0 {
        warn!(user_id = claims.user_id, "Refresh token reuse or unknown jti");
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }

    tx.commit().await?;

    let subject = TokenSubject {
        user_id: claims.user_id,
        username: &claims.sub,
        role: claims.role,
        employee_id: claims.employee_id,
    };
    let pair = issue_pair(&subject, pool.get_ref(), config.get_ref()).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// Log out
///
/// Always answers 204, whether or not the token was known.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        warn!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "someone".into(),
            role,
            employee_id: None,
        }
    }

    #[test]
    fn first_account_is_always_admin() {
        assert_eq!(registration_role(0, None, 3).unwrap(), Role::Admin);
        assert_eq!(
            registration_role(0, Some(&caller(Role::Employee)), 4).unwrap(),
            Role::Admin
        );
    }

    #[test]
    fn later_accounts_need_an_admin_caller() {
        assert!(matches!(
            registration_role(1, None, 3),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            registration_role(1, Some(&caller(Role::Supervisor)), 3),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(
            registration_role(1, Some(&caller(Role::Admin)), 4).unwrap(),
            Role::Kiosk
        );
        assert!(matches!(
            registration_role(1, Some(&caller(Role::Admin)), 9),
            Err(AppError::Validation(_))
        ));
    }
}

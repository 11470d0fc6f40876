use crate::{
    api::{
        attendance, branch, catalog, checkin, employee, incident, logs, schedule, template, zone,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Milliseconds between replenished requests for a per-minute quota.
fn replenish_interval_ms(requests_per_min: u32) -> u64 {
    if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    }
}

// Per-route limiter keyed by peer IP
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    // finish() only fails on a zero period or burst, both excluded here
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(replenish_interval_ms(requests_per_min))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let identify_limiter = Arc::new(build_limiter(config.rate_identify_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/templates")
                    // /templates/identify
                    .service(
                        web::resource("/identify")
                            .wrap(identify_limiter)
                            .route(web::post().to(template::identify)),
                    )
                    // /templates/employee/{id}
                    .service(
                        web::resource("/employee/{id}")
                            .route(web::get().to(template::list_employee_templates)),
                    )
                    // /templates
                    .service(web::resource("").route(web::post().to(template::enroll_template))),
            )
            .service(web::resource("/checkins").route(web::post().to(checkin::check_location)))
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/branches")
                    .service(
                        web::resource("")
                            .route(web::get().to(branch::list_branches))
                            .route(web::post().to(branch::create_branch)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(branch::delete_branch)),
                    ),
            )
            .service(
                web::resource("/zone")
                    .route(web::get().to(zone::get_zone))
                    .route(web::post().to(zone::save_zone)),
            )
            .service(
                web::scope("/schedules")
                    .service(web::resource("").route(web::post().to(schedule::create_schedule)))
                    .service(
                        web::resource("/employee/{id}")
                            .route(web::get().to(schedule::list_employee_schedules)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(schedule::delete_schedule)),
                    ),
            )
            .service(
                web::resource("/incidents")
                    .route(web::post().to(incident::create_incident))
                    .route(web::get().to(incident::list_incidents)),
            )
            .service(web::resource("/attendance").route(web::get().to(attendance::list_attendance)))
            .service(
                web::resource("/logs/employees").route(web::get().to(logs::list_employee_logs)),
            )
            .service(web::resource("/departments").route(web::get().to(catalog::list_departments)))
            .service(web::resource("/roles").route(web::get().to(catalog::list_roles))),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// KIOSK
//  └─ POST /api/templates/identify with Bearer access_token
//       └─ identified employee gets the next check-in / check-out

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new token pair, old refresh token revoked

use crate::{
    api::{attendance, attendance_admin, gym, location, shift, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{Scope, middleware::from_fn, web};
use std::sync::Arc;

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / u64::from(requests_per_min);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// `/attendance`: self-service endpoints plus the staff-only `/admin` ones.
/// Handlers authenticate through the `AuthUser` extractor.
pub fn attendance_scope() -> Scope {
    web::scope("/attendance")
        .service(web::resource("/time-in").route(web::post().to(attendance::time_in)))
        .service(web::resource("/time-out").route(web::post().to(attendance::time_out)))
        .service(web::resource("/today").route(web::get().to(attendance::today)))
        .service(web::resource("/history").route(web::get().to(attendance::history)))
        .service(web::resource("/stats/monthly").route(web::get().to(attendance::monthly_stats)))
        // /attendance/admin must be registered before /attendance/{id}
        .service(
            web::resource("/admin")
                .route(web::post().to(attendance_admin::create_record))
                .route(web::get().to(attendance_admin::list_records)),
        )
        .service(
            web::resource("/admin/{id}")
                .route(web::get().to(attendance_admin::get_record))
                .route(web::put().to(attendance_admin::update_record)),
        )
        .service(web::resource("/{id}").route(web::put().to(attendance::update_own)))
}

pub fn shift_scope() -> Scope {
    web::scope("/shifts")
        .service(
            web::resource("")
                .route(web::get().to(shift::list_shifts))
                .route(web::post().to(shift::create_shift)),
        )
        .service(web::resource("/current").route(web::get().to(shift::current_shift)))
        .service(web::resource("/{id}").route(web::put().to(shift::update_shift)))
}

fn user_scope() -> Scope {
    web::scope("/users")
        .service(web::resource("").route(web::get().to(user::list_users)))
        .service(web::resource("/{id}").route(web::get().to(user::get_user)))
}

/// Gym creation and lookups are public so a new gym can bootstrap itself.
fn gym_scope() -> Scope {
    web::scope("/gyms")
        .service(
            web::resource("")
                .route(web::post().to(gym::create_gym))
                .route(web::get().to(gym::list_gyms)),
        )
        .service(web::resource("/{id}").route(web::get().to(gym::get_gym)))
        .service(web::resource("/{id}/users").route(web::get().to(user::gym_users)))
}

/// Reads are public (registration needs them); writes check for staff.
fn location_scopes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/state-country")
            .service(
                web::resource("")
                    .route(web::post().to(location::create_state_country))
                    .route(web::get().to(location::list_state_countries)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(location::get_state_country))
                    .route(web::delete().to(location::delete_state_country)),
            ),
    )
    .service(
        web::scope("/pincodes")
            .service(
                web::resource("")
                    .route(web::post().to(location::create_pincode))
                    .route(web::get().to(location::list_pincodes)),
            )
            .service(web::resource("/code/{pincode}").route(web::get().to(location::get_pincode_by_code)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(location::get_pincode))
                    .route(web::delete().to(location::delete_pincode)),
            ),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            // Public routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(login_limiter.clone())
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/register")
                            .wrap(register_limiter.clone())
                            .route(web::post().to(handlers::register)),
                    )
                    .service(
                        web::resource("/verify-otp")
                            .wrap(register_limiter.clone())
                            .route(web::post().to(handlers::verify_otp)),
                    )
                    .service(
                        web::resource("/resend-otp")
                            .wrap(register_limiter)
                            .route(web::post().to(handlers::resend_otp)),
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
            )
            .service(gym_scope())
            .configure(location_scopes)
            // Protected routes; the empty scope must stay last
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter)
                    .service(attendance_scope())
                    .service(shift_scope())
                    .service(user_scope()),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

use crate::{
    api::{attendance, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let burst = requests_per_min.max(1);
        let per_ms = 60_000 / burst as u64;
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms.max(1))
            .burst_size(burst)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("limiter period and burst are non-zero");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
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
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    .service(web::resource("/scan").route(web::post().to(attendance::scan)))
                    .service(web::resource("/me").route(web::get().to(attendance::my_attendance)))
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // /attendance/user/{uid}
                    .service(
                        web::resource("/user/{uid}")
                            .route(web::get().to(attendance::user_attendance)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::get().to(users::list_users))
                            .route(web::post().to(users::create_user)),
                    )
                    // /users/{uid}
                    .service(
                        web::resource("/{uid}")
                            .route(web::get().to(users::get_user))
                            .route(web::put().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    )
                    // /users/{uid}/card
                    .service(web::resource("/{uid}/card").route(web::get().to(users::id_card))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Bearer refresh_token
//       └─ returns new token pair

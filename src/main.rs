use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod repository;
mod routes;
mod service;
mod utils;

use config::Config;
use db::init_db;
use repository::Repositories;

use crate::utils::{email_cache, email_filter};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "QR Attendance API"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let repos = Repositories::mysql(pool);

    let users_for_filter_warmup = repos.users.clone();
    let users_for_cache_warmup = repos.users.clone();
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let openapi = docs::openapi_for(&config.api_prefix);

    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(users_for_filter_warmup.as_ref(), 100).await
        {
            error!(error = ?e, "Failed to warm up email filter");
        }
    });

    actix_web::rt::spawn(async move {
        if let Err(e) = email_cache::warmup_email_cache(users_for_cache_warmup.as_ref(), 250).await {
            error!(error = ?e, "Failed to warm up email cache");
        }
    });

    info!(addr = %server_addr, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} matches JS/CSS files
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(Data::new(repos.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use tracing::{info, instrument};

use crate::auth::auth::{AuthUser, bearer};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{LoginReqDto, RegisterReqDto};
use crate::repository::Repositories;
use crate::service::{auth as auth_service, users};

/// User self-registration
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReqDto,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "error": "Password must be at least 6 characters"
        })),
        (status = 409, description = "Email already in use")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(repos, body), fields(email = %body.email))]
pub async fn register(
    body: web::Json<RegisterReqDto>,
    repos: web::Data<Repositories>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let user = auth_service::register(
        repos.get_ref(),
        &body.email,
        &body.password,
        &body.confirm_password,
        &body.names,
        &body.lastnames,
        Utc::now(),
    )
    .await?;

    info!(uid = %user.uid, "User registered");
    Ok(HttpResponse::Created().json(user))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is disabled")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(repos, config, body), fields(email = %body.email))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let (user, tokens) =
        auth_service::login(repos.get_ref(), config.get_ref(), &body.email, &body.password)
            .await?;

    info!(uid = %user.uid, role = %user.role(), "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchange a refresh token (sent as Bearer) for a new pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid, revoked or expired refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;
    let tokens = auth_service::refresh(repos.get_ref(), config.get_ref(), token).await?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// Revoke a refresh token (sent as Bearer). Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    if let Some(token) = bearer(&req) {
        auth_service::logout(repos.get_ref(), config.get_ref(), token).await?;
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Profile of the logged-in user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    auth: AuthUser,
    repos: web::Data<Repositories>,
) -> Result<HttpResponse, AppError> {
    let user = users::get_user(repos.get_ref(), &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

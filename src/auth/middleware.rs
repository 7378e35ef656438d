use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::models::TokenType;
use crate::repository::Repositories;

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({ "error": message }));
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let repos = req
        .app_data::<Data<Repositories>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Repositories missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => return Ok(reject(req, "Invalid Authorization header encoding")),
        },
        None => return Ok(reject(req, "Missing Authorization header")),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(reject(req, "Authorization header must start with Bearer"));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Token rejected");
            return Ok(reject(req, "Invalid or expired token"));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(reject(req, "Access token required"));
    }

    // role and active flag are read from the store, not the token
    let user = match repos.users.find(&claims.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(reject(req, "Account not found")),
        Err(e) => {
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    if !user.active {
        let resp = AppError::Forbidden("Account is disabled".into()).error_response();
        return Ok(req.into_response(resp));
    }

    req.extensions_mut().insert(AuthUser {
        role: user.role(),
        user_id: user.uid,
    });

    next.call(req).await
}

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::role::Role;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

pub fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    // resolved by auth_middleware
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }

    /// Admins may act on anyone; teachers only on themselves.
    pub fn require_self_or_admin(&self, user_id: &str) -> Result<(), AppError> {
        if self.role == Role::Admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }
}

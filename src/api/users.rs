use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::user::{User, UserPatch};
use crate::repository::Repositories;
use crate::service::users::{self as users_service, NewAccount};

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "ana@school.edu", format = "email")]
    pub email: String,
    #[schema(example = "secreto1")]
    pub password: String,
    #[schema(example = "Ana")]
    pub names: String,
    #[schema(example = "Quispe")]
    pub lastnames: String,
    #[serde(default)]
    #[schema(example = false)]
    pub admin: bool,
    /// Base64 encoded photo, optionally with a `data:` prefix
    #[schema(nullable = true)]
    pub photo_base64: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub names: Option<String>,
    pub lastnames: Option<String>,
    pub admin: Option<bool>,
    pub photo_base64: Option<String>,
    /// Drop the stored photo; wins over `photo_base64`
    #[serde(default)]
    pub remove_photo: bool,
}

impl From<UpdateUser> for UserPatch {
    fn from(body: UpdateUser) -> Self {
        let photo_base64 = if body.remove_photo {
            Some(None)
        } else {
            body.photo_base64.map(Some)
        };

        UserPatch {
            names: body.names,
            lastnames: body.lastnames,
            admin: body.admin,
            photo_base64,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 12)]
    pub total: usize,
}

/// List active users (admin)
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Active users", body = UserListResponse),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    repos: web::Data<Repositories>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let data = users_service::list_active(repos.get_ref()).await?;
    Ok(HttpResponse::Ok().json(UserListResponse {
        total: data.len(),
        data,
    }))
}

/// Add a teacher account (admin)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already in use", body = Object, example = json!({
            "error": "Email already in use"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    body: web::Json<CreateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let body = body.into_inner();
    let user = users_service::create_account(
        repos.get_ref(),
        NewAccount {
            email: body.email,
            password: body.password,
            names: body.names,
            lastnames: body.lastnames,
            admin: body.admin,
            photo_base64: body.photo_base64,
        },
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(user))
}

/// Get a user (admin, or the user themselves)
#[utoipa::path(
    get,
    path = "/api/users/{uid}",
    params(("uid", Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = Object, example = json!({
            "error": "User not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();
    auth.require_self_or_admin(&uid)?;

    let user = users_service::get_user(repos.get_ref(), &uid).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Edit a teacher (admin)
#[utoipa::path(
    put,
    path = "/api/users/{uid}",
    params(("uid", Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Nothing to update or blank names"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    path: web::Path<String>,
    body: web::Json<UpdateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let uid = path.into_inner();
    let user =
        users_service::update_user(repos.get_ref(), &uid, UserPatch::from(body.into_inner()))
            .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// Deactivate a teacher; records are kept (admin)
#[utoipa::path(
    delete,
    path = "/api/users/{uid}",
    params(("uid", Path, description = "User id")),
    responses(
        (status = 200, description = "Deactivated", body = Object, example = json!({
            "message": "Successfully deactivated"
        })),
        (status = 403, description = "Admin only, or own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let uid = path.into_inner();
    users_service::soft_delete(repos.get_ref(), &auth.user_id, &uid, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deactivated"
    })))
}

/// Data for a printable ID card (admin)
#[utoipa::path(
    get,
    path = "/api/users/{uid}/card",
    params(("uid", Path, description = "User id")),
    responses(
        (status = 200, description = "Card data", body = IdCard),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn id_card(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user = users_service::get_user(repos.get_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(users_service::id_card(&user, Utc::now())))
}

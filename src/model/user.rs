use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "uid": "5f0c6a52-3b7e-4d8e-8f0e-8f4a2b1c9d33",
        "email": "ana@school.edu",
        "names": "Ana",
        "lastnames": "Quispe",
        "admin": false,
        "active": true,
        "photo_base64": null,
        "created_at": "2026-02-01T09:00:00Z",
        "deleted_at": null
    })
)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub names: String,
    pub lastnames: String,
    pub admin: bool,

    /// false once the account has been soft deleted; gates login
    pub active: bool,

    #[schema(nullable = true)]
    pub photo_base64: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Role {
        if self.admin { Role::Admin } else { Role::Teacher }
    }
}

/// Login identity, kept apart from the profile the way an auth provider
/// keeps accounts apart from application data.
#[derive(Debug, Clone)]
pub struct Credential {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
}

/// Fields an admin may change on an existing account.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub names: Option<String>,
    pub lastnames: Option<String>,
    pub admin: Option<bool>,

    /// `Some(None)` clears the photo
    pub photo_base64: Option<Option<String>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.names.is_none()
            && self.lastnames.is_none()
            && self.admin.is_none()
            && self.photo_base64.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(names) = &self.names {
            user.names = names.clone();
        }
        if let Some(lastnames) = &self.lastnames {
            user.lastnames = lastnames.clone();
        }
        if let Some(admin) = self.admin {
            user.admin = admin;
        }
        if let Some(photo) = &self.photo_base64 {
            user.photo_base64 = photo.clone();
        }
    }
}

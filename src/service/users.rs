use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::model::user::{Credential, User, UserPatch};
use crate::repository::Repositories;
use crate::service::attendance::qr_payload;
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, require_max_len, require_non_blank, validate_email,
    validate_password,
};
use crate::utils::{email_cache, email_filter};

/// Everything needed to open an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub names: String,
    pub lastnames: String,
    pub admin: bool,
    pub photo_base64: Option<String>,
}

/// Data printed on a teacher's ID card.
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "uid": "5f0c6a52-3b7e-4d8e-8f0e-8f4a2b1c9d33",
    "short_id": "5F0C6A52",
    "names": "Ana",
    "lastnames": "Quispe",
    "email": "ana@school.edu",
    "issued": "03/2026",
    "qr_payload": "TEACHER:5f0c6a52-3b7e-4d8e-8f0e-8f4a2b1c9d33:ana@school.edu",
    "has_photo": true
}))]
pub struct IdCard {
    pub uid: String,
    pub short_id: String,
    pub names: String,
    pub lastnames: String,
    pub email: String,
    /// MM/YYYY, local time
    pub issued: String,
    pub qr_payload: String,
    pub has_photo: bool,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_new_account(account: &NewAccount) -> AppResult<()> {
    require_non_blank(&account.names, "Names")?;
    require_non_blank(&account.lastnames, "Last names")?;
    require_max_len(account.names.trim(), MAX_NAME_LEN, "Names")?;
    require_max_len(account.lastnames.trim(), MAX_NAME_LEN, "Last names")?;
    validate_email(&account.email)?;
    require_max_len(account.email.trim(), MAX_EMAIL_LEN, "Email")?;
    validate_password(&account.password)
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(repos: &Repositories, email: &str) -> AppResult<bool> {
    let email = normalize_email(email);

    // Cuckoo filter: fast negative
    if !email_filter::might_exist(&email) {
        return Ok(true);
    }

    // Moka cache: fast positive
    if email_cache::is_taken(&email).await {
        return Ok(false);
    }

    // Store fallback
    Ok(repos.credentials.find_by_email(&email).await?.is_none())
}

/// Create the login credential, then the profile. If the profile cannot be
/// written the credential is deleted again.
#[instrument(name = "create_account", skip(repos, account), fields(email = %account.email))]
pub async fn create_account(
    repos: &Repositories,
    account: NewAccount,
    now: DateTime<Utc>,
) -> AppResult<User> {
    validate_new_account(&account)?;
    let email = normalize_email(&account.email);

    if !is_email_available(repos, &email).await? {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let credential = Credential {
        uid: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: hash_password(&account.password)?,
    };
    repos.credentials.insert(&credential).await?;

    let user = User {
        uid: credential.uid.clone(),
        email: email.clone(),
        names: account.names.trim().to_string(),
        lastnames: account.lastnames.trim().to_string(),
        admin: account.admin,
        active: true,
        photo_base64: account.photo_base64.filter(|p| !p.is_empty()),
        created_at: now,
        deleted_at: None,
    };

    if let Err(e) = repos.users.insert(&user).await {
        warn!(uid = %user.uid, error = %e, "Profile write failed, removing credential");
        if let Err(rollback) = repos.credentials.delete(&credential.uid).await {
            error!(uid = %credential.uid, error = %rollback, "Credential rollback failed");
        }
        return Err(e);
    }

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;
    info!(uid = %user.uid, admin = user.admin, "Account created");

    Ok(user)
}

pub async fn list_active(repos: &Repositories) -> AppResult<Vec<User>> {
    repos.users.list_active().await
}

pub async fn get_user(repos: &Repositories, uid: &str) -> AppResult<User> {
    repos
        .users
        .find(uid)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn update_user(repos: &Repositories, uid: &str, patch: UserPatch) -> AppResult<User> {
    if patch.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }
    if let Some(names) = &patch.names {
        require_non_blank(names, "Names")?;
        require_max_len(names.trim(), MAX_NAME_LEN, "Names")?;
    }
    if let Some(lastnames) = &patch.lastnames {
        require_non_blank(lastnames, "Last names")?;
        require_max_len(lastnames.trim(), MAX_NAME_LEN, "Last names")?;
    }

    let patch = UserPatch {
        names: patch.names.map(|n| n.trim().to_string()),
        lastnames: patch.lastnames.map(|n| n.trim().to_string()),
        photo_base64: patch
            .photo_base64
            .map(|photo| photo.filter(|p| !p.is_empty())),
        ..patch
    };

    if !repos.users.update(uid, &patch).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(uid, "User updated");

    get_user(repos, uid).await
}

/// Mark the account inactive; its attendance history stays.
pub async fn soft_delete(
    repos: &Repositories,
    acting_uid: &str,
    uid: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if acting_uid == uid {
        return Err(AppError::Forbidden(
            "You cannot deactivate your own account".to_string(),
        ));
    }
    if !repos.users.deactivate(uid, now).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(uid, by = acting_uid, "User deactivated");
    Ok(())
}

pub fn id_card(user: &User, now: DateTime<Utc>) -> IdCard {
    IdCard {
        uid: user.uid.clone(),
        short_id: user.uid.chars().take(8).collect::<String>().to_uppercase(),
        names: user.names.clone(),
        lastnames: user.lastnames.clone(),
        email: user.email.clone(),
        issued: now.with_timezone(&Local).format("%m/%Y").to_string(),
        qr_payload: qr_payload(user),
        has_photo: user.photo_base64.as_deref().is_some_and(|p| !p.is_empty()),
    }
}

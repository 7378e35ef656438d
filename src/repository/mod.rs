use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::AppResult;
use crate::model::attendance::AttendanceRecord;
use crate::model::user::{Credential, User, UserPatch};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Append-only store of scan events.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn insert(&self, record: &AttendanceRecord) -> AppResult<()>;

    /// Newest first
    async fn by_user(&self, user_id: &str) -> AppResult<Vec<AttendanceRecord>>;

    /// Records of `user_id` with `from <= timestamp < to`, newest first
    async fn by_user_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceRecord>>;

    /// Newest first
    async fn all(&self) -> AppResult<Vec<AttendanceRecord>>;

    /// Records with `from <= timestamp <= to`, newest first
    async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> AppResult<()>;
    async fn find(&self, uid: &str) -> AppResult<Option<User>>;
    async fn list_active(&self) -> AppResult<Vec<User>>;

    /// Returns false when no user has that id
    async fn update(&self, uid: &str, patch: &UserPatch) -> AppResult<bool>;

    /// Returns false when no user has that id
    async fn deactivate(&self, uid: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// Every registered email, active or not
    async fn emails(&self) -> AppResult<Vec<String>>;
}

/// Account store used for login, separate from profiles.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn insert(&self, credential: &Credential) -> AppResult<()>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>>;
    async fn delete(&self, uid: &str) -> AppResult<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn store(&self, user_id: &str, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()>;

    /// true if the token existed and was not revoked yet
    async fn is_active(&self, jti: &str) -> AppResult<bool>;

    async fn revoke(&self, jti: &str) -> AppResult<()>;
}

/// Shared handle to every store, injected into handlers as app data.
#[derive(Clone)]
pub struct Repositories {
    pub attendance: Arc<dyn AttendanceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl Repositories {
    pub fn mysql(pool: sqlx::MySqlPool) -> Self {
        Self {
            attendance: Arc::new(mysql::MySqlAttendanceRepository::new(pool.clone())),
            users: Arc::new(mysql::MySqlUserRepository::new(pool.clone())),
            credentials: Arc::new(mysql::MySqlCredentialRepository::new(pool.clone())),
            refresh_tokens: Arc::new(mysql::MySqlRefreshTokenRepository::new(pool)),
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySqlPool};
use std::str::FromStr;
use tracing::error;

use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceRecord, AttendanceType};
use crate::model::user::{Credential, User, UserPatch};
use crate::repository::{
    AttendanceRepository, CredentialRepository, RefreshTokenRepository, UserRepository,
};

const ATTENDANCE_COLUMNS: &str = "id, user_id, user_names, user_lastnames, attendance_type, \
     timestamp, latitude, longitude, location_address, qr_data";

const USER_COLUMNS: &str =
    "uid, email, names, lastnames, admin, active, photo_base64, created_at, deleted_at";

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    user_names: String,
    user_lastnames: String,
    attendance_type: String,
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    location_address: String,
    qr_data: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let attendance_type = AttendanceType::from_str(&row.attendance_type).map_err(|_| {
            error!(id = %row.id, value = %row.attendance_type, "Unknown attendance type in store");
            AppError::Unknown
        })?;

        Ok(AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            user_names: row.user_names,
            user_lastnames: row.user_lastnames,
            attendance_type,
            timestamp: row.timestamp,
            latitude: row.latitude,
            longitude: row.longitude,
            location_address: row.location_address,
            qr_data: row.qr_data,
        })
    }
}

fn into_records(rows: Vec<AttendanceRow>) -> AppResult<Vec<AttendanceRecord>> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

#[derive(FromRow)]
struct UserRow {
    uid: String,
    email: String,
    names: String,
    lastnames: String,
    admin: bool,
    active: bool,
    photo_base64: Option<String>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            uid: row.uid,
            email: row.email,
            names: row.names,
            lastnames: row.lastnames,
            admin: row.admin,
            active: row.active,
            photo_base64: row.photo_base64,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

pub struct MySqlAttendanceRepository {
    pool: MySqlPool,
}

impl MySqlAttendanceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for MySqlAttendanceRepository {
    async fn insert(&self, record: &AttendanceRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance
            (id, user_id, user_names, user_lastnames, attendance_type,
             timestamp, latitude, longitude, location_address, qr_data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.user_names)
        .bind(&record.user_lastnames)
        .bind(record.attendance_type.to_string())
        .bind(record.timestamp)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(&record.location_address)
        .bind(&record.qr_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn by_user(&self, user_id: &str) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? ORDER BY timestamp DESC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    async fn by_user_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE user_id = ? AND timestamp >= ? AND timestamp < ? \
             ORDER BY timestamp DESC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    async fn all(&self) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance ORDER BY timestamp DESC");
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE timestamp >= ? AND timestamp <= ? \
             ORDER BY timestamp DESC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }
}

pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
            (uid, email, names, lastnames, admin, active, photo_base64, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&user.names)
        .bind(&user.lastnames)
        .bind(user.admin)
        .bind(user.active)
        .bind(&user.photo_base64)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, uid: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE active = TRUE ORDER BY lastnames, names"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update(&self, uid: &str, patch: &UserPatch) -> AppResult<bool> {
        // last writer wins on concurrent edits
        let Some(mut user) = self.find(uid).await? else {
            return Ok(false);
        };
        patch.apply(&mut user);

        sqlx::query(
            r#"
            UPDATE users
            SET names = ?, lastnames = ?, admin = ?, photo_base64 = ?
            WHERE uid = ?
            "#,
        )
        .bind(&user.names)
        .bind(&user.lastnames)
        .bind(user.admin)
        .bind(&user.photo_base64)
        .bind(uid)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    async fn deactivate(&self, uid: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE uid = ? LIMIT 1)",
        )
        .bind(uid)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET active = FALSE, deleted_at = ? WHERE uid = ?")
            .bind(at)
            .bind(uid)
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    async fn emails(&self) -> AppResult<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT email FROM users")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(email,)| email).collect())
    }
}

pub struct MySqlCredentialRepository {
    pool: MySqlPool,
}

impl MySqlCredentialRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CredentialRow {
    uid: String,
    email: String,
    password_hash: String,
}

#[async_trait]
impl CredentialRepository for MySqlCredentialRepository {
    async fn insert(&self, credential: &Credential) -> AppResult<()> {
        sqlx::query("INSERT INTO credentials (uid, email, password_hash) VALUES (?, ?, ?)")
            .bind(&credential.uid)
            .bind(&credential.email)
            .bind(&credential.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict("Email already in use".to_string()),
                other => other,
            })?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT uid, email, password_hash FROM credentials WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Credential {
            uid: r.uid,
            email: r.email,
            password_hash: r.password_hash,
        }))
    }

    async fn delete(&self, uid: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM credentials WHERE uid = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

pub struct MySqlRefreshTokenRepository {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for MySqlRefreshTokenRepository {
    async fn store(&self, user_id: &str, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn is_active(&self, jti: &str) -> AppResult<bool> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT revoked FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(matches!(revoked, Some(false)))
    }

    async fn revoke(&self, jti: &str) -> AppResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{AppError, AppResult};
use crate::model::attendance::AttendanceRecord;
use crate::model::user::{Credential, User, UserPatch};
use crate::repository::{
    AttendanceRepository, CredentialRepository, RefreshTokenRepository, Repositories,
    UserRepository,
};

fn newest_first(mut records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
    records.sort_by(|a, b| (b.timestamp, &b.id).cmp(&(a.timestamp, &a.id)));
    records
}

#[derive(Default)]
pub struct MemoryAttendanceRepository {
    records: Mutex<Vec<AttendanceRecord>>,
}

#[async_trait]
impl AttendanceRepository for MemoryAttendanceRepository {
    async fn insert(&self, record: &AttendanceRecord) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.id == record.id) {
            return Err(AppError::Conflict("Record already exists".into()));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn by_user(&self, user_id: &str) -> AppResult<Vec<AttendanceRecord>> {
        let records = self.records.lock().unwrap();
        Ok(newest_first(
            records.iter().filter(|r| r.user_id == user_id).cloned().collect(),
        ))
    }

    async fn by_user_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let records = self.records.lock().unwrap();
        Ok(newest_first(
            records
                .iter()
                .filter(|r| r.user_id == user_id && r.timestamp >= from && r.timestamp < to)
                .cloned()
                .collect(),
        ))
    }

    async fn all(&self) -> AppResult<Vec<AttendanceRecord>> {
        Ok(newest_first(self.records.lock().unwrap().clone()))
    }

    async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let records = self.records.lock().unwrap();
        Ok(newest_first(
            records
                .iter()
                .filter(|r| r.timestamp >= from && r.timestamp <= to)
                .cloned()
                .collect(),
        ))
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<HashMap<String, User>>,

    /// Makes the next inserts fail, to exercise registration rollback
    pub fail_inserts: AtomicBool,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Network);
        }
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.uid) || users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Record already exists".into()));
        }
        users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn find(&self, uid: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(uid).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.active)
            .cloned()
            .collect();
        users.sort_by(|a, b| (&a.lastnames, &a.names).cmp(&(&b.lastnames, &b.names)));
        Ok(users)
    }

    async fn update(&self, uid: &str, patch: &UserPatch) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(uid) {
            Some(user) => {
                patch.apply(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate(&self, uid: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(uid) {
            Some(user) => {
                user.active = false;
                user.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn emails(&self) -> AppResult<Vec<String>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .map(|u| u.email.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryCredentialRepository {
    credentials: Mutex<HashMap<String, Credential>>,
}

impl MemoryCredentialRepository {
    pub fn len(&self) -> usize {
        self.credentials.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialRepository for MemoryCredentialRepository {
    async fn insert(&self, credential: &Credential) -> AppResult<()> {
        let mut credentials = self.credentials.lock().unwrap();
        if credentials.values().any(|c| c.email == credential.email) {
            return Err(AppError::Conflict("Email already in use".into()));
        }
        credentials.insert(credential.uid.clone(), credential.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn delete(&self, uid: &str) -> AppResult<()> {
        self.credentials.lock().unwrap().remove(uid);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokenRepository {
    // jti -> revoked
    tokens: Mutex<HashMap<String, bool>>,
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn store(&self, _user_id: &str, jti: &str, _expires_at: DateTime<Utc>) -> AppResult<()> {
        self.tokens.lock().unwrap().insert(jti.to_string(), false);
        Ok(())
    }

    async fn is_active(&self, jti: &str) -> AppResult<bool> {
        Ok(matches!(self.tokens.lock().unwrap().get(jti), Some(false)))
    }

    async fn revoke(&self, jti: &str) -> AppResult<()> {
        if let Some(revoked) = self.tokens.lock().unwrap().get_mut(jti) {
            *revoked = true;
        }
        Ok(())
    }
}

/// In-memory stores plus typed handles for assertions.
pub struct MemoryStores {
    pub attendance: Arc<MemoryAttendanceRepository>,
    pub users: Arc<MemoryUserRepository>,
    pub credentials: Arc<MemoryCredentialRepository>,
    pub refresh_tokens: Arc<MemoryRefreshTokenRepository>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self {
            attendance: Arc::new(MemoryAttendanceRepository::default()),
            users: Arc::new(MemoryUserRepository::default()),
            credentials: Arc::new(MemoryCredentialRepository::default()),
            refresh_tokens: Arc::new(MemoryRefreshTokenRepository::default()),
        }
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            attendance: self.attendance.clone(),
            users: self.users.clone(),
            credentials: self.credentials.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
        }
    }
}

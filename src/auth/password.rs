use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::error;

use crate::error::{AppError, AppResult};

pub fn hash_password(password: &str) -> AppResult<String> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            AppError::Unknown
        })
}

/// false on mismatch or on a stored hash that cannot be parsed
pub fn verify_password(password: &str, hashed: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed) else {
        error!("Stored password hash is malformed");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("secreto1").unwrap();
        assert!(verify_password("secreto1", &hash));
        assert!(!verify_password("secreto2", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("secreto1", "not-a-hash"));
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

// Column widths in the schema
pub const MAX_NAME_LEN: usize = 120;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_TEXT_LEN: usize = 512;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn require_non_blank(value: &str, what: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{what} are required")));
    }
    Ok(())
}

pub fn require_max_len(value: &str, max: usize, what: &str) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{what} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !is_valid_email(email.trim()) {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    user_id: &str,
    email: &str,
    role: u8,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> AppResult<(String, Claims)> {
    let claims = Claims {
        user_id: user_id.to_string(),
        sub: email.to_string(),
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, "Token encoding failed");
        AppError::Unknown
    })?;

    Ok((token, claims))
}

pub fn generate_access_token(
    user_id: &str,
    email: &str,
    role: u8,
    secret: &str,
    ttl: usize,
) -> AppResult<String> {
    issue(user_id, email, role, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    user_id: &str,
    email: &str,
    role: u8,
    secret: &str,
    ttl: usize,
) -> AppResult<(String, Claims)> {
    issue(user_id, email, role, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

pub fn expires_at(claims: &Claims) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trips_claims() {
        let token = generate_access_token("u-1", "ana@school.edu", 2, SECRET, 60).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        assert_eq!(claims.user_id, "u-1");
        assert_eq!(claims.sub, "ana@school.edu");
        assert_eq!(claims.role, 2);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_tokens_get_distinct_ids() {
        let (_, a) = generate_refresh_token("u-1", "ana@school.edu", 2, SECRET, 60).unwrap();
        let (_, b) = generate_refresh_token("u-1", "ana@school.edu", 2, SECRET, 60).unwrap();
        assert_ne!(a.jti, b.jti);
        assert_eq!(a.token_type, TokenType::Refresh);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token("u-1", "ana@school.edu", 2, SECRET, 60).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }
}

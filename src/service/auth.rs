use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::auth::jwt::{expires_at, generate_access_token, generate_refresh_token, verify_token};
use crate::auth::password::verify_password;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::user::User;
use crate::models::{TokenPair, TokenType};
use crate::repository::Repositories;
use crate::service::users::{NewAccount, create_account, normalize_email};

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

/// Self-service sign up. Always creates a non-admin account.
pub async fn register(
    repos: &Repositories,
    email: &str,
    password: &str,
    confirm_password: &str,
    names: &str,
    lastnames: &str,
    now: DateTime<Utc>,
) -> AppResult<User> {
    if password != confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }

    create_account(
        repos,
        NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            names: names.to_string(),
            lastnames: lastnames.to_string(),
            admin: false,
            photo_base64: None,
        },
        now,
    )
    .await
}

async fn issue_tokens(repos: &Repositories, config: &Config, user: &User) -> AppResult<TokenPair> {
    let role = user.role().id();

    let access_token = generate_access_token(
        &user.uid,
        &user.email,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;
    let (refresh_token, refresh_claims) = generate_refresh_token(
        &user.uid,
        &user.email,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    repos
        .refresh_tokens
        .store(&user.uid, &refresh_claims.jti, expires_at(&refresh_claims))
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Check the password, then the active flag, then hand out tokens.
pub async fn login(
    repos: &Repositories,
    config: &Config,
    email: &str,
    password: &str,
) -> AppResult<(User, TokenPair)> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let Some(credential) = repos.credentials.find_by_email(&email).await? else {
        info!("Invalid credentials: unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(password, &credential.password_hash) {
        info!("Invalid credentials: password mismatch");
        return Err(invalid_credentials());
    }

    let user = repos
        .users
        .find(&credential.uid)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !user.active {
        info!(uid = %user.uid, "Login refused: account disabled");
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }

    let tokens = issue_tokens(repos, config, &user).await?;
    Ok((user, tokens))
}

/// Rotate a refresh token: the presented one is revoked, a new pair issued.
pub async fn refresh(
    repos: &Repositories,
    config: &Config,
    refresh_token: &str,
) -> AppResult<TokenPair> {
    let claims = verify_token(refresh_token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    if claims.token_type != TokenType::Refresh
        || !repos.refresh_tokens.is_active(&claims.jti).await?
    {
        return Err(AppError::Unauthorized("Invalid token".to_string()));
    }
    repos.refresh_tokens.revoke(&claims.jti).await?;

    let user = match repos.users.find(&claims.user_id).await? {
        Some(user) if user.active => user,
        _ => return Err(AppError::Unauthorized("Account is disabled".to_string())),
    };

    issue_tokens(repos, config, &user).await
}

/// Revoke a refresh token. Unknown or invalid tokens are ignored.
pub async fn logout(repos: &Repositories, config: &Config, refresh_token: &str) -> AppResult<()> {
    let Ok(claims) = verify_token(refresh_token, &config.jwt_secret) else {
        return Ok(());
    };
    if claims.token_type != TokenType::Refresh {
        return Ok(());
    }
    repos.refresh_tokens.revoke(&claims.jti).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStores;
    use crate::service::users::soft_delete;

    async fn registered(repos: &Repositories, email: &str) -> User {
        register(
            repos,
            email,
            "secreto1",
            "secreto1",
            "Ana",
            "Quispe",
            Utc::now(),
        )
        .await
        .unwrap()
    }

    #[actix_web::test]
    async fn register_requires_matching_passwords() {
        let stores = MemoryStores::new();
        let repos = stores.repositories();

        let err = register(
            &repos,
            "mismatch@school.edu",
            "secreto1",
            "secreto2",
            "Ana",
            "Quispe",
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, AppError::validation("Passwords do not match"));
    }

    #[actix_web::test]
    async fn login_issues_tokens_for_active_user() {
        let stores = MemoryStores::new();
        let repos = stores.repositories();
        let config = Config::for_tests();
        let user = registered(&repos, "login.ok@school.edu").await;

        let (logged_in, tokens) = login(&repos, &config, " Login.OK@school.edu", "secreto1")
            .await
            .unwrap();
        assert_eq!(logged_in.uid, user.uid);

        let claims = verify_token(&tokens.access_token, &config.jwt_secret).unwrap();
        assert_eq!(claims.user_id, user.uid);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[actix_web::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let stores = MemoryStores::new();
        let repos = stores.repositories();
        let config = Config::for_tests();
        registered(&repos, "login.bad@school.edu").await;

        let wrong = login(&repos, &config, "login.bad@school.edu", "nope-nope")
            .await
            .unwrap_err();
        let unknown = login(&repos, &config, "nobody@school.edu", "secreto1")
            .await
            .unwrap_err();
        assert_eq!(wrong, invalid_credentials());
        assert_eq!(unknown, invalid_credentials());
    }

    #[actix_web::test]
    async fn deactivated_user_cannot_log_in_or_refresh() {
        let stores = MemoryStores::new();
        let repos = stores.repositories();
        let config = Config::for_tests();
        let user = registered(&repos, "login.off@school.edu").await;

        let (_, tokens) = login(&repos, &config, "login.off@school.edu", "secreto1")
            .await
            .unwrap();
        soft_delete(&repos, "admin", &user.uid, Utc::now())
            .await
            .unwrap();

        let err = login(&repos, &config, "login.off@school.edu", "secreto1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = refresh(&repos, &config, &tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn refresh_rotates_and_logout_revokes() {
        let stores = MemoryStores::new();
        let repos = stores.repositories();
        let config = Config::for_tests();
        registered(&repos, "rotate@school.edu").await;

        let (_, first) = login(&repos, &config, "rotate@school.edu", "secreto1")
            .await
            .unwrap();
        let second = refresh(&repos, &config, &first.refresh_token).await.unwrap();

        // the old refresh token is spent
        assert!(refresh(&repos, &config, &first.refresh_token).await.is_err());

        logout(&repos, &config, &second.refresh_token).await.unwrap();
        assert!(refresh(&repos, &config, &second.refresh_token).await.is_err());
    }

    #[actix_web::test]
    async fn access_token_cannot_refresh() {
        let stores = MemoryStores::new();
        let repos = stores.repositories();
        let config = Config::for_tests();
        registered(&repos, "access.only@school.edu").await;

        let (_, tokens) = login(&repos, &config, "access.only@school.edu", "secreto1")
            .await
            .unwrap();
        assert!(refresh(&repos, &config, &tokens.access_token).await.is_err());
        assert!(logout(&repos, &config, "garbage").await.is_ok());
    }
}

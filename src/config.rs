use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: or_default("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_register_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

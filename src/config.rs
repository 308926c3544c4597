// config.rs
use std::env;

use crate::errors::{AppError, Result};

/// Process-wide configuration, loaded once at startup.
///
/// The three signing secrets are deliberately independent so each token
/// kind can be rotated on its own. There is no shared fallback secret.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub reset_token_secret: String,
    pub access_token_ttl_min: i64,
    pub refresh_token_ttl_min: i64,
    pub reset_token_ttl_min: i64,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub port: u16,
    pub host: String,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(AppConfig {
            database_url: require("DATABASE_URL")?,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "arehan".to_string()),
            access_token_secret: require("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: require("REFRESH_TOKEN_SECRET")?,
            reset_token_secret: require("RESET_TOKEN_SECRET")?,
            access_token_ttl_min: minutes("ACCESS_TOKEN_TTL_MIN", 15)?,
            refresh_token_ttl_min: minutes("REFRESH_TOKEN_TTL_MIN", 7 * 24 * 60)?,
            reset_token_ttl_min: minutes("RESET_TOKEN_TTL_MIN", 10)?,
            mail_api_url: env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            mail_api_key: require("MAIL_API_KEY")?,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@arehan.app".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| AppError::Configuration("PORT must be a number".to_string()))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn require(key: &str) -> Result<String> {
    env::var(key).map_err(|_| AppError::Configuration(format!("{} must be set", key)))
}

fn minutes(key: &str, default: i64) -> Result<i64> {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} must be a number of minutes", key))),
        Err(_) => Ok(default),
    }
}

// src/config.rs

use std::{env, net::SocketAddr};

use thiserror::Error;

/// Default token lifetime: 24 hours.
pub const DEFAULT_JWT_EXPIRATION: u64 = 60 * 60 * 24;

/// Number of quizzes returned by the "recent" listing.
pub const RECENT_QUIZ_LIMIT: i64 = 6;

/// Number of attempts shown in the per-quiz analytics feed.
pub const RECENT_ATTEMPT_LIMIT: usize = 10;

/// Process configuration, assembled once in `main` and handed to the router
/// through `AppState`. Nothing below the entry point reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Startup configuration failure, naming the offending key.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: '{value}'")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = optional("DATABASE_URL");

        let jwt_secret = optional("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match optional("JWT_EXPIRATION") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value: raw,
            })?,
            None => DEFAULT_JWT_EXPIRATION,
        };

        let rust_log = optional("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bind_addr = match optional("BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 5000)),
        };

        let cors_origins = optional("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            cors_origins,
            admin_name: optional("ADMIN_NAME"),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }

    /// Minimal configuration for tests and embedded use: in-memory store, no seeding.
    pub fn for_secret(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origins: Vec::new(),
            admin_name: None,
            admin_email: None,
            admin_password: None,
        }
    }
}

/// Reads a variable, treating empty values as unset.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

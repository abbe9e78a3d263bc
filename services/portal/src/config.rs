//! services/portal/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use apex_access_core::config::{
    AuthConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_LOGIN_PAGE, DEFAULT_SESSION_TIMEOUT,
};
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// JSON file holding the access ledger when no database is configured.
    pub storage_path: PathBuf,
    /// Selects the PostgreSQL store when present.
    pub database_url: Option<String>,
    pub admin_token: Option<String>,
    pub allowed_origin: String,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: Level::INFO,
            storage_path: PathBuf::from("./data/apex_store.json"),
            database_url: None,
            admin_token: None,
            allowed_origin: "http://localhost:3000".to_string(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server Settings ---
        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        HeaderValue::from_str(&allowed_origin).map_err(|e| {
            ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), e.to_string())
        })?;

        // --- Storage Settings ---
        let storage_path = std::env::var("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/apex_store.json"));
        let database_url = non_empty_var("DATABASE_URL");

        // --- Auth Settings ---
        let admin_token = non_empty_var("ADMIN_TOKEN");
        let login_page =
            std::env::var("LOGIN_PAGE").unwrap_or_else(|_| DEFAULT_LOGIN_PAGE.to_string());
        let session_timeout = parse_secs("SESSION_TIMEOUT_SECS", DEFAULT_SESSION_TIMEOUT)?;
        let check_interval = parse_secs("CHECK_INTERVAL_SECS", DEFAULT_CHECK_INTERVAL)?;
        if check_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "CHECK_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            log_level,
            storage_path,
            database_url,
            admin_token,
            allowed_origin,
            auth: AuthConfig {
                login_page,
                session_timeout,
                check_interval,
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

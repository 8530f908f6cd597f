//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// A credential from the built-in admin set. Always active, always admin,
/// compared verbatim at login. Shadows the persistent account store.
#[derive(Clone)]
pub struct BuiltinUser {
    pub username: String,
    pub password: String,
}

// Deliberately opaque so the password can never land in a log line.
impl std::fmt::Debug for BuiltinUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinUser")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Absolute base for tracking URLs embedded in printed QR codes.
    pub base_url: String,
    /// The token-signing secret. Never logged.
    pub token_secret: String,
    pub token_ttl_minutes: i64,
    pub allowed_origins: Vec<String>,
    pub builtin_users: Vec<BuiltinUser>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("base_url", &self.base_url)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("allowed_origins", &self.allowed_origins)
            .field("builtin_users", &self.builtin_users)
            .finish_non_exhaustive()
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

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Tracking and Token Settings ---
        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_address))
            .trim_end_matches('/')
            .to_string();

        let token_secret = std::env::var("TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("TOKEN_SECRET".to_string()))?;

        let token_ttl_str =
            std::env::var("TOKEN_TTL_MINUTES").unwrap_or_else(|_| "30".to_string());
        let token_ttl_minutes = token_ttl_str.parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(
                "TOKEN_TTL_MINUTES".to_string(),
                format!("'{}' is not a valid minute count", token_ttl_str),
            )
        })?;
        if token_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let builtin_users = Self::parse_builtin_users(
            &std::env::var("BUILTIN_ADMIN_USERS").unwrap_or_default(),
        )?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            base_url,
            token_secret,
            token_ttl_minutes,
            allowed_origins,
            builtin_users,
        })
    }

    /// Parses `user:password` pairs, comma-separated. An entry without a
    /// colon is a configuration error rather than a silently skipped user.
    fn parse_builtin_users(raw: &str) -> Result<Vec<BuiltinUser>, ConfigError> {
        let mut users = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (username, password) = entry.split_once(':').ok_or_else(|| {
                ConfigError::InvalidValue(
                    "BUILTIN_ADMIN_USERS".to_string(),
                    "entries must be user:password pairs".to_string(),
                )
            })?;
            users.push(BuiltinUser {
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        Ok(users)
    }

    /// The absolute tracking URL a printed QR code resolves to.
    pub fn tracking_url(&self, tracking_id: &str) -> String {
        format!("{}/track/{}", self.base_url, tracking_id)
    }
}

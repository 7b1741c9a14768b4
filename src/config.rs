//! Process configuration parsed once from environment variables.
//!
//! `main` loads `.env` with dotenvy, calls [`AppConfig::from_env`], and hands
//! the result to the store, auth, and route layers. Nothing else reads the
//! environment.

use time::Duration;

use crate::services::auth::AuthSettings;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
/// Ten years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;
pub const DEFAULT_BOARD_NAME: &str = "Main Board";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required when KANBOARD_STORE=postgres")]
    Missing { var: &'static str },
    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreBackend,
    /// Present whenever `store` is `Postgres`.
    pub database_url: Option<String>,
    pub port: u16,
    pub db_max_connections: u32,
    /// Sets the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,
    pub auth: AuthSettings,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `KANBOARD_STORE`: `postgres` (default) or `memory`
    /// - `DATABASE_URL`: required for `postgres`
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `SESSION_TTL_HOURS`: default 168, at most 87600
    /// - `COOKIE_SECURE`: default false
    /// - `DEFAULT_BOARD_NAME`: default "Main Board"
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing database URL or unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing database URL or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let store = parse_backend(var("KANBOARD_STORE").as_deref())?;
        let database_url = var("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing { var: "DATABASE_URL" });
        }

        let ttl_hours = parse_or("SESSION_TTL_HOURS", var("SESSION_TTL_HOURS"), DEFAULT_SESSION_TTL_HOURS)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl_hours) {
            return Err(ConfigError::Invalid {
                var: "SESSION_TTL_HOURS",
                message: format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            });
        }

        Ok(Self {
            store,
            database_url,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", var("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS)?,
            cookie_secure: parse_bool("COOKIE_SECURE", var("COOKIE_SECURE").as_deref())?,
            auth: AuthSettings {
                session_ttl: Duration::hours(ttl_hours),
                default_board_name: var("DEFAULT_BOARD_NAME").unwrap_or_else(|| DEFAULT_BOARD_NAME.to_owned()),
            },
        })
    }
}

fn parse_backend(raw: Option<&str>) -> Result<StoreBackend, ConfigError> {
    match raw.unwrap_or("postgres") {
        "postgres" => Ok(StoreBackend::Postgres),
        "memory" => Ok(StoreBackend::Memory),
        other => Err(ConfigError::Invalid {
            var: "KANBOARD_STORE",
            message: format!("unknown backend '{other}' (expected 'postgres' or 'memory')"),
        }),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { var, message: e.to_string() }),
    }
}

fn parse_bool(var: &'static str, raw: Option<&str>) -> Result<bool, ConfigError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid { var, message: format!("not a boolean: {other}") }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

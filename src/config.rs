//! Runtime configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads an optional `.env` file via `dotenvy`, then builds a single
//! `Config` that is shared through `AppState`. Everything except
//! `DATABASE_URL` has a default so a bare `cargo run` only needs a database.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_INDEX_CACHE_SECS: u64 = 20;
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Posts per page on every paginated listing.
    pub page_size: i64,
    /// TTL of the cached index page. Zero disables caching.
    pub index_cache_ttl: Duration,
    pub media_root: PathBuf,
    pub max_upload_bytes: usize,
    pub cookie_secure: bool,
    /// Optional YAML file of groups upserted at startup.
    pub groups_file: Option<PathBuf>,
}

impl Config {
    /// Build config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is unset or a numeric variable
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let page_size: i64 = env_parse_strict("PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid { var: "PAGE_SIZE", value: page_size.to_string() });
        }

        Ok(Self {
            database_url,
            port: env_parse_strict("PORT", DEFAULT_PORT)?,
            db_max_connections: env_parse_strict("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            page_size,
            index_cache_ttl: Duration::from_secs(env_parse_strict("INDEX_CACHE_SECONDS", DEFAULT_INDEX_CACHE_SECS)?),
            media_root: std::env::var("MEDIA_ROOT").map_or_else(|_| PathBuf::from(DEFAULT_MEDIA_ROOT), PathBuf::from),
            max_upload_bytes: env_parse_strict("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            groups_file: std::env::var("GROUPS_FILE").ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from),
        })
    }

    /// Defaults for everything, pointing at the given database URL.
    #[must_use]
    pub fn with_database_url(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_owned(),
            port: DEFAULT_PORT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            page_size: DEFAULT_PAGE_SIZE,
            index_cache_ttl: Duration::from_secs(DEFAULT_INDEX_CACHE_SECS),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cookie_secure: false,
            groups_file: None,
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| parse_bool(&raw))
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `key` if set, falling back to `default` when unset. A set but
/// unparseable value is an error rather than a silent default.
fn env_parse_strict<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::{env, fmt};

use thiserror::Error;

/// Default mount point of the author routes.
pub const DEFAULT_AUTHORS_PREFIX: &str = "/authors";

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and pulled into
/// handlers via `FromRef` as part of the shared `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and whether a database is mandatory.
    pub env: Env,
    // Postgres connection string. `None` runs against the in-memory store (local only).
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Mount prefix of the author router, e.g. "/authors".
    pub authors_prefix: String,
    // Optional admin account created at startup.
    pub admin: Option<AdminSeed>,
}

/// Env
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AdminSeed
///
/// Credentials of the bootstrap admin. `Debug` redacts the password.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl Default for AppConfig {
    /// Test scaffolding: in-memory store, default prefix, no bootstrap admin.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            db_max_connections: 5,
            bind_addr: "127.0.0.1:3000".to_string(),
            authors_prefix: DEFAULT_AUTHORS_PREFIX.to_string(),
            admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production requires
    /// `DATABASE_URL`; local mode falls back to the in-memory store.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match var("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = var("DATABASE_URL");
        if env == Env::Production && db_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                reason: e.to_string(),
            })?,
            None => 5,
        };

        let authors_prefix = normalize_prefix(
            var("AUTHORS_PREFIX").unwrap_or_else(|| DEFAULT_AUTHORS_PREFIX.to_string()),
        )?;

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            env,
            db_url,
            db_max_connections,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            authors_prefix,
            admin,
        })
    }
}

// Unset and empty are treated alike.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Prefixes must start with '/'; a trailing slash is dropped. "/" mounts at the root.
fn normalize_prefix(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(ConfigError::Invalid {
            name: "AUTHORS_PREFIX",
            reason: format!("{trimmed:?} must start with '/'"),
        });
    }
    let without_slash = trimmed.trim_end_matches('/');
    if without_slash.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(without_slash.to_string())
    }
}

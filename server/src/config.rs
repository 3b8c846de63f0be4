//! Server configuration parsed from environment variables.
//!
//! `.env` is loaded by `main` through `dotenvy` before this runs. Every key
//! except `DATABASE_URL` has a default; unparseable values fall back to the
//! default rather than failing startup.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_CURSOR_STALE_SECS: u64 = canvas::consts::CURSOR_STALE_SECS;
pub const DEFAULT_CURSOR_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Postgres connection string. `None` runs on in-memory stores.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Outbound frame buffer per websocket connection.
    pub client_channel_capacity: usize,
    /// Cursor rows not refreshed within this window are swept.
    pub cursor_stale: Duration,
    pub cursor_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            cursor_stale: Duration::from_secs(DEFAULT_CURSOR_STALE_SECS),
            cursor_sweep_interval: Duration::from_secs(DEFAULT_CURSOR_SWEEP_INTERVAL_SECS),
        }
    }
}

impl ServerConfig {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: in-memory stores when absent or empty
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256
    /// - `CURSOR_STALE_SECS`: default 300
    /// - `CURSOR_SWEEP_INTERVAL_SECS`: default 60
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str, default: u64| env_parse(lookup(key), default);
        Self {
            port: parse("PORT", DEFAULT_PORT.into()).try_into().unwrap_or(DEFAULT_PORT),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS.into())
                .try_into()
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            client_channel_capacity: parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY as u64)
                .try_into()
                .unwrap_or(DEFAULT_CLIENT_CHANNEL_CAPACITY)
                .max(1),
            cursor_stale: Duration::from_secs(parse("CURSOR_STALE_SECS", DEFAULT_CURSOR_STALE_SECS)),
            cursor_sweep_interval: Duration::from_secs(
                parse("CURSOR_SWEEP_INTERVAL_SECS", DEFAULT_CURSOR_SWEEP_INTERVAL_SECS).max(1),
            ),
        }
    }
}

/// Parse an optional raw value, falling back to `default`.
pub(crate) fn env_parse<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

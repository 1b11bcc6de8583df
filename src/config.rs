//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::RevalidationMode;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Default TTL in seconds for miss-filled entries, 0 = no default
    pub default_ttl: u64,
    /// Background cleanup task interval in seconds, 0 = disabled
    pub cleanup_interval: u64,
    /// JSON file acting as the origin for `/cache`
    pub origin_path: PathBuf,
    /// Snapshot file for the `/cache` engine
    pub cache_path: PathBuf,
    /// SQLite database holding the user directory for `/users`
    pub users_db_path: PathBuf,
    /// Snapshot file for the `/users` engine
    pub users_cache_path: PathBuf,
    /// Await revalidation inside `Get` instead of detaching it
    pub revalidate_inline: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_HOST` - Bind address (default: 0.0.0.0)
    /// - `SERVER_PORT` - HTTP server port (default: 8777)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 60)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 0, disabled)
    /// - `ORIGIN_PATH` - Origin JSON file (default: origin.json)
    /// - `CACHE_PATH` - Cache snapshot file (default: cache.json)
    /// - `USERS_DB_PATH` - User directory SQLite database (default: users.db)
    /// - `USERS_CACHE_PATH` - User cache snapshot file (default: cache_users.json)
    /// - `REVALIDATE_INLINE` - `true`/`1` to revalidate synchronously (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            origin_path: env::var("ORIGIN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.origin_path),
            cache_path: env::var("CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            users_db_path: env::var("USERS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.users_db_path),
            users_cache_path: env::var("USERS_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.users_cache_path),
            revalidate_inline: env::var("REVALIDATE_INLINE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.revalidate_inline),
        }
    }

    /// Default TTL as a duration, `None` when disabled.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl))
    }

    /// Revalidation strategy selected by `revalidate_inline`.
    pub fn revalidation_mode(&self) -> RevalidationMode {
        if self.revalidate_inline {
            RevalidationMode::Inline
        } else {
            RevalidationMode::Background
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8777,
            default_ttl: 60,
            cleanup_interval: 0,
            origin_path: PathBuf::from("origin.json"),
            cache_path: PathBuf::from("cache.json"),
            users_db_path: PathBuf::from("users.db"),
            users_cache_path: PathBuf::from("cache_users.json"),
            revalidate_inline: false,
        }
    }
}

//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration against a local backend.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use matcha_shared::constants::{
    DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_STEP_MS, DEFAULT_SOCKET_URL,
};

use crate::guard::RouteConfig;

/// Where the session token and identity are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Per-user data directory (see `matcha_store::Database::default_path`).
    Default,
    Path(PathBuf),
    /// Volatile; nothing survives a restart.
    Memory,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every REST path is joined onto.
    /// Env: `MATCHA_API_URL`
    /// Default: `http://localhost:5000/api`
    pub api_base_url: String,

    /// WebSocket endpoint of the real-time channel.
    /// Env: `MATCHA_SOCKET_URL`
    /// Default: `ws://localhost:5000/ws`
    pub socket_url: String,

    /// Per-request timeout.
    /// Env: `MATCHA_HTTP_TIMEOUT_SECS`
    /// Default: `15`
    pub http_timeout: Duration,

    /// Connect attempts before the channel gives up and leaves freshness
    /// to the backup poll.
    /// Env: `MATCHA_RECONNECT_ATTEMPTS`
    /// Default: `5`
    pub reconnect_attempts: u32,

    /// Linear backoff step; attempt `n` waits `n * step` after failing.
    /// Env: `MATCHA_RECONNECT_STEP_MS`
    /// Default: `1000`
    pub reconnect_step: Duration,

    /// Backup poll interval for notifications.
    /// Env: `MATCHA_POLL_SECS`
    /// Default: `30`
    pub poll_interval: Duration,

    /// Env: `MATCHA_STORAGE_PATH` (`:memory:` for a volatile store)
    /// Default: the per-user data directory.
    pub storage: StorageLocation,

    pub routes: RouteConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_step: Duration::from_millis(DEFAULT_RECONNECT_STEP_MS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            storage: StorageLocation::Default,
            routes: RouteConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("MATCHA_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = lookup("MATCHA_SOCKET_URL") {
            config.socket_url = url;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "MATCHA_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs.max(1));
        }

        if let Some(attempts) = parse_var::<u32>(&lookup, "MATCHA_RECONNECT_ATTEMPTS") {
            config.reconnect_attempts = attempts;
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "MATCHA_RECONNECT_STEP_MS") {
            config.reconnect_step = Duration::from_millis(ms);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "MATCHA_POLL_SECS") {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }

        if let Some(path) = lookup("MATCHA_STORAGE_PATH") {
            config.storage = match path.as_str() {
                ":memory:" => StorageLocation::Memory,
                "" => StorageLocation::Default,
                other => StorageLocation::Path(PathBuf::from(other)),
            };
        }

        debug!(
            api = %config.api_base_url,
            socket = %config.socket_url,
            storage = ?config.storage,
            "Client configuration loaded"
        );
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

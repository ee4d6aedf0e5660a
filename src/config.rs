//! Runtime configuration read from the environment

use crate::constants::{DEFAULT_CACHE_TTL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT};
use std::time::Duration;

/// Environment-overridable service settings.
///
/// Unset or unparseable variables fall back to the documented defaults; a
/// bad value never fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Delay between poll cycles (`POLL_INTERVAL_MS`, default 15000)
    pub poll_interval: Duration,
    /// How long a merged view stays cached (`CACHE_TTL_MS`, default 30000)
    pub cache_ttl: Duration,
    /// HTTP/WebSocket listen port (`PORT`, default 3000)
    pub port: u16,
}

impl Config {
    /// Builds the configuration from the process environment
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(env_u64(
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            cache_ttl: Duration::from_millis(env_u64("CACHE_TTL_MS", DEFAULT_CACHE_TTL_MS)),
            port: env_u64("PORT", DEFAULT_PORT as u64) as u16,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            port: DEFAULT_PORT,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

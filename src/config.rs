//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::messages::Locale;

/// Longest accepted session lifetime.
pub const MAX_SESSION_TTL_DAYS: i64 = 365;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote REST API
    pub api_base_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds a cached query stays fresh
    pub stale_time: u64,
    /// Seconds an unobserved cached query survives before eviction
    pub gc_time: u64,
    /// Maximum number of cached queries
    pub max_queries: usize,
    /// Retries after a failed query fetch
    pub retry_count: u32,
    /// Base delay of the exponential retry backoff, in milliseconds
    pub retry_base_delay_ms: u64,
    /// Backend request timeout, in milliseconds
    pub request_timeout_ms: u64,
    /// Background maintenance interval in seconds
    pub cleanup_interval: u64,
    /// Session lifetime in days
    pub session_ttl_days: i64,
    /// Directory where draft form state is kept
    pub drafts_dir: PathBuf,
    /// Language of fallback messages
    pub locale: Locale,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Remote API base URL (default: http://localhost:8000/api)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STALE_TIME` - Query freshness window in seconds (default: 60)
    /// - `GC_TIME` - Idle query eviction window in seconds (default: 300)
    /// - `MAX_QUERIES` - Cached query capacity (default: 1000)
    /// - `RETRY_COUNT` - Fetch retries (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - Backoff base delay (default: 1000)
    /// - `REQUEST_TIMEOUT_MS` - Backend timeout (default: 30000)
    /// - `CLEANUP_INTERVAL` - Maintenance frequency in seconds (default: 30)
    /// - `SESSION_TTL_DAYS` - Session lifetime, 1 to 365 (default: 7)
    /// - `DRAFTS_DIR` - Draft storage directory (default: .drafts)
    /// - `LOCALE` - `en` or `ar` (default: en)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            stale_time: parse_env("STALE_TIME").unwrap_or(defaults.stale_time),
            gc_time: parse_env("GC_TIME").unwrap_or(defaults.gc_time),
            max_queries: parse_env("MAX_QUERIES").unwrap_or(defaults.max_queries),
            retry_count: parse_env("RETRY_COUNT").unwrap_or(defaults.retry_count),
            retry_base_delay_ms: parse_env("RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            request_timeout_ms: parse_env("REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            session_ttl_days: session_ttl_days(parse_env("SESSION_TTL_DAYS"))
                .unwrap_or(defaults.session_ttl_days),
            drafts_dir: env::var("DRAFTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.drafts_dir),
            locale: parse_env("LOCALE").unwrap_or(defaults.locale),
        }
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_time)
    }

    /// Session lifetime, clamped to `1..=MAX_SESSION_TTL_DAYS`.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days.clamp(1, MAX_SESSION_TTL_DAYS))
    }
}

fn session_ttl_days(value: Option<i64>) -> Option<i64> {
    match value {
        Some(days) if !(1..=MAX_SESSION_TTL_DAYS).contains(&days) => {
            warn!(
                "SESSION_TTL_DAYS={} outside 1..={}, using the default",
                days, MAX_SESSION_TTL_DAYS
            );
            None
        }
        other => other,
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            server_port: 3000,
            stale_time: 60,
            gc_time: 300,
            max_queries: 1000,
            retry_count: 3,
            retry_base_delay_ms: 1000,
            request_timeout_ms: 30_000,
            cleanup_interval: 30,
            session_ttl_days: 7,
            drafts_dir: PathBuf::from(".drafts"),
            locale: Locale::En,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.stale_time, 60);
        assert_eq!(config.gc_time, 300);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.session_ttl_days, 7);
        assert_eq!(config.locale, Locale::En);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("STALE_TIME");
        env::remove_var("GC_TIME");
        env::remove_var("SESSION_TTL_DAYS");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.stale_time(), Duration::from_secs(60));
        assert_eq!(config.gc_time(), Duration::from_secs(300));
        assert_eq!(config.session_ttl_days, 7);
    }

    #[test]
    fn test_session_ttl_out_of_range_is_rejected() {
        assert_eq!(session_ttl_days(Some(30)), Some(30));
        assert_eq!(session_ttl_days(Some(0)), None);
        assert_eq!(session_ttl_days(Some(-4)), None);
        assert_eq!(session_ttl_days(Some(i64::MAX)), None);
        assert_eq!(session_ttl_days(None), None);
    }

    #[test]
    fn test_session_ttl_is_clamped() {
        let mut config = Config::default();
        assert_eq!(config.session_ttl(), chrono::Duration::days(7));

        config.session_ttl_days = i64::MAX;
        assert_eq!(config.session_ttl(), chrono::Duration::days(MAX_SESSION_TTL_DAYS));

        config.session_ttl_days = -1;
        assert_eq!(config.session_ttl(), chrono::Duration::days(1));
    }
}

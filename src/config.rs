//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid WELLNESS_API_URL '{0}' (expected http:// or https://)")]
    InvalidApiUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API root without a trailing slash.
    pub api_url: String,
    /// Persisted sessions older than this are discarded on restore.
    pub session_max_age: Duration,
    /// Deferral before the first restore in an interactive context.
    pub startup_delay: Duration,
    pub timeouts: HttpTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
            startup_delay: Duration::from_millis(DEFAULT_STARTUP_DELAY_MS),
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `WELLNESS_API_URL`: default `http://localhost:8000/api`
    /// - `WELLNESS_SESSION_MAX_AGE_SECS`: default 604800 (7 days)
    /// - `WELLNESS_STARTUP_DELAY_MS`: default 100
    /// - `WELLNESS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `WELLNESS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] when the API URL has no http(s) scheme.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] when the API URL has no http(s) scheme.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("WELLNESS_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }

        let max_age_secs = parse_or(&lookup, "WELLNESS_SESSION_MAX_AGE_SECS", DEFAULT_SESSION_MAX_AGE_SECS);
        let startup_delay_ms = parse_or(&lookup, "WELLNESS_STARTUP_DELAY_MS", DEFAULT_STARTUP_DELAY_MS);
        let timeouts = HttpTimeouts {
            request_secs: parse_or(&lookup, "WELLNESS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "WELLNESS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            session_max_age: Duration::from_secs(max_age_secs),
            startup_delay: Duration::from_millis(startup_delay_ms),
            timeouts,
        })
    }

    /// Maximum session age in milliseconds, saturating.
    #[must_use]
    pub fn session_max_age_millis(&self) -> i64 {
        i64::try_from(self.session_max_age.as_millis()).unwrap_or(i64::MAX)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

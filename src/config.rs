//! Startup configuration from environment variables

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROVIDER_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ORDER_PROVIDER_URL is not a valid http(s) URL: {0}")]
    InvalidUrl(String),
}

/// Settings read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider_url: String,
    pub request_timeout: Duration,
    pub reset_delay: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider_url = lookup("ORDER_PROVIDER_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string());

        match Url::parse(&provider_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidUrl(provider_url)),
        }

        let request_timeout = parse_u64(&lookup, "ORDER_REQUEST_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
        let reset_delay = parse_u64(&lookup, "ORDER_RESET_DELAY_MS")
            .map_or(crate::state_machine::state::DEFAULT_RESET_DELAY, Duration::from_millis);

        Ok(Self {
            provider_url,
            request_timeout,
            reset_delay,
        })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
            None
        }
    }
}

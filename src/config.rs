// Client and cache configuration, with environment overrides

use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_BASE_URL: &str = "TOUR_API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "TOUR_API_TIMEOUT_MS";
pub const ENV_CACHE_MAX_MB: &str = "TOUR_CACHE_MAX_MB";
pub const ENV_CACHE_TTL_SECS: &str = "TOUR_CACHE_TTL_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    // Transport timeout; the pipeline itself enforces none
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 30_000,
            user_agent: format!("tour-catalog/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let base_url = env::var(ENV_BASE_URL).unwrap_or_else(|_| {
            info!("{ENV_BASE_URL} not set, using default: {}", defaults.base_url);
            defaults.base_url.clone()
        });
        let base_url = validate_base_url(&base_url)
            .with_context(|| format!("{ENV_BASE_URL} is misconfigured"))?;

        Ok(Self {
            base_url,
            timeout_ms: try_load(ENV_TIMEOUT_MS, defaults.timeout_ms),
            user_agent: defaults.user_agent,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub max_size_mb: usize,
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 16,
            default_ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size_mb: try_load(ENV_CACHE_MAX_MB, defaults.max_size_mb),
            default_ttl_seconds: try_load(ENV_CACHE_TTL_SECS, defaults.default_ttl_seconds),
        }
    }
}

// Trailing slashes are stripped so paths can be appended as-is
fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        anyhow::bail!("base url must start with http:// or https://, got {raw:?}");
    }
    Ok(trimmed.to_string())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => default,
    }
}

//! API engine and transport settings
//!
//! Both structs deserialize from TOML tables with every field optional;
//! missing fields fall back to the wire defaults in `constants`.

use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    API_VERSION, AUTH_POLL_INTERVAL_MS, DEFAULT_BASE_URL, DEFAULT_ID_LIST_BUDGET,
    DEFAULT_MAX_REAUTH_ATTEMPTS, RATE_LIMIT_RETRY_MS,
};

/// Call engine settings (`[api]` table)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    pub rate_limit_retry_ms: u64,
    pub auth_poll_interval_ms: u64,
    /// Encoded length budget for one comma-joined id list
    pub id_list_budget: usize,
    pub max_reauth_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version: API_VERSION.to_string(),
            rate_limit_retry_ms: RATE_LIMIT_RETRY_MS,
            auth_poll_interval_ms: AUTH_POLL_INTERVAL_MS,
            id_list_budget: DEFAULT_ID_LIST_BUDGET,
            max_reauth_attempts: DEFAULT_MAX_REAUTH_ATTEMPTS,
        }
    }
}

impl ApiConfig {
    pub fn rate_limit_retry(&self) -> Duration {
        Duration::from_millis(self.rate_limit_retry_ms)
    }

    pub fn auth_poll_interval(&self) -> Duration {
        Duration::from_millis(self.auth_poll_interval_ms)
    }

    pub fn validate(&self) -> common::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(common::Error::InvalidValue {
                field: "base_url",
                reason: format!("must start with http:// or https://, got: {}", self.base_url),
            });
        }
        if self.version.is_empty() {
            return Err(common::Error::InvalidValue {
                field: "version",
                reason: "must not be empty".into(),
            });
        }
        if self.rate_limit_retry_ms == 0 {
            return Err(common::Error::InvalidValue {
                field: "rate_limit_retry_ms",
                reason: "must be greater than 0".into(),
            });
        }
        if self.auth_poll_interval_ms == 0 {
            return Err(common::Error::InvalidValue {
                field: "auth_poll_interval_ms",
                reason: "must be greater than 0".into(),
            });
        }
        if self.id_list_budget == 0 {
            return Err(common::Error::InvalidValue {
                field: "id_list_budget",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// HTTP client settings (`[http]` table)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub max_redirects: usize,
    /// Keep a cookie jar shared by every request of the session
    pub cookies: bool,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 4,
            max_redirects: 10,
            cookies: true,
            user_agent: concat!("vk-api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> common::Result<()> {
        if self.timeout_secs == 0 {
            return Err(common::Error::InvalidValue {
                field: "timeout_secs",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

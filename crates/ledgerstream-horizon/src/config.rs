//! Horizon client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonConfig {
    /// Base URL, e.g. `https://horizon.stellar.org`.
    pub url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay between ledger polls once the subscription has caught up.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Records per page for both ledger and transaction requests.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_request_timeout_ms() -> u64 { 30_000 }
fn default_poll_interval_ms() -> u64 { 1_000 }
fn default_page_limit() -> u32 { 200 }

impl HorizonConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            page_limit: default_page_limit(),
            retry: RetryConfig::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Cap on the backoff delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff_ms() -> u64 { 100 }
fn default_max_backoff_ms() -> u64 { 10_000 }
fn default_multiplier() -> f64 { 2.0 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: HorizonConfig = serde_json::from_str(r#"{"url":"http://localhost:8000"}"#).unwrap();
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.page_limit, 200);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.max_backoff_ms, 10_000);
    }

    #[test]
    fn partial_retry_section() {
        let cfg: HorizonConfig =
            serde_json::from_str(r#"{"url":"u","retry":{"max_retries":0}}"#).unwrap();
        assert_eq!(cfg.retry.max_retries, 0);
        assert_eq!(cfg.retry.initial_backoff_ms, 100);
    }
}

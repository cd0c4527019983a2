//! # Conductor Config
//!
//! Recognized configuration options exposed to all components, plus YAML
//! loading and validation. Every section has defaults, so an empty file (or
//! no file at all) yields a working configuration.

mod loader;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use loader::{load_config, ConfigError};

/// Full Conductor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConductorConfig {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Executor limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Default parallel batch size
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Task cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entry retention in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

/// Per-agent throttle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_requests_per_interval")]
    pub requests_per_interval: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl RateLimitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_interval: default_requests_per_interval(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Defaults for the retry helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Outbound LLM gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_gateway_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_gateway_model")]
    pub model: String,
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gateway_endpoint(),
            api_key: None,
            model: default_gateway_model(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

/// HTTP submission surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_max_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_requests_per_interval() -> u32 {
    60
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_gateway_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_gateway_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sensible() {
        let config = ConductorConfig::default();
        assert_eq!(config.limits.max_concurrency, 4);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_yaml_fills_in_defaults() {
        let config: ConductorConfig = serde_yaml::from_str(
            r#"
limits:
  max_concurrency: 8
rate_limit:
  enabled: true
"#,
        )
        .expect("parse");

        assert_eq!(config.limits.max_concurrency, 8);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.requests_per_interval, 60);
        assert_eq!(config.cache.ttl_ms, 300_000);
    }

    #[test]
    fn test_empty_yaml_is_the_default_config() {
        let config: ConductorConfig = serde_yaml::from_str("{}").expect("parse");
        assert_eq!(config.limits.max_concurrency, 4);
        assert_eq!(config.server.listen, "127.0.0.1:8080");
    }
}

//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::ConductorConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load and validate Conductor configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<ConductorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ConductorConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ConductorConfig) -> Result<(), ConfigError> {
    if config.limits.max_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_concurrency must be > 0".to_string(),
        ));
    }

    if config.cache.enabled && config.cache.ttl_ms == 0 {
        return Err(ConfigError::Invalid(
            "cache.ttl_ms must be > 0 when cache is enabled".to_string(),
        ));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_interval == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.requests_per_interval must be > 0 when enabled".to_string(),
            ));
        }
        if config.rate_limit.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.interval_ms must be > 0 when enabled".to_string(),
            ));
        }
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "retry.max_attempts must be > 0".to_string(),
        ));
    }

    if config.gateway.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "gateway.endpoint must not be empty".to_string(),
        ));
    }

    if config.gateway.model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "gateway.model must not be empty".to_string(),
        ));
    }

    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "server.listen must not be empty".to_string(),
        ));
    }

    Ok(())
}

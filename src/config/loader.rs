//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment
//! variables.

use std::path::Path;

use tracing::{debug, info, warn};

use super::types::Config;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}")))?;

    config.validate()?;

    info!(
        "Configuration loaded: {} observers, max_backup_attempts={}",
        config.observers.len(),
        config.failover.max_backup_attempts
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `EXITLINE_CONTROLLER_URL`: Override control-plane base URL
/// - `EXITLINE_CONTROLLER_SECRET`: Override control-plane secret
/// - `EXITLINE_POOL_URL`: Override pool service base URL
/// - `EXITLINE_LOG_LEVEL`: Override log level
/// - `EXITLINE_MAX_BACKUP_ATTEMPTS`: Override backup attempt budget
///
/// # Errors
///
/// Returns `ConfigError` if loading, parsing, or an override fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var("EXITLINE_CONTROLLER_URL") {
        info!("Overriding controller URL from environment");
        config.controller.base_url = url;
    }

    if let Ok(secret) = std::env::var("EXITLINE_CONTROLLER_SECRET") {
        config.controller.secret = Some(secret);
    }

    if let Ok(url) = std::env::var("EXITLINE_POOL_URL") {
        info!("Overriding pool URL from environment");
        config.pool.base_url = url;
    }

    if let Ok(level) = std::env::var("EXITLINE_LOG_LEVEL") {
        config.log.level = level;
    }

    if let Ok(raw) = std::env::var("EXITLINE_MAX_BACKUP_ATTEMPTS") {
        let attempts = raw.parse::<u32>().map_err(|e| ConfigError::EnvError {
            name: "EXITLINE_MAX_BACKUP_ATTEMPTS".into(),
            reason: e.to_string(),
        })?;
        warn!(
            "Overriding max_backup_attempts: {} -> {}",
            config.failover.max_backup_attempts, attempts
        );
        config.failover.max_backup_attempts = attempts;
    }

    Ok(())
}

/// Write a default configuration file
///
/// # Errors
///
/// Returns `ConfigError` if serialization or the write fails.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    std::fs::write(path.as_ref(), json)?;
    info!("Default configuration written to {:?}", path.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "controller": { "base_url": "http://127.0.0.1:9090" },
        "pool": { "base_url": "https://pool.internal" },
        "observers": [
            { "tag": "ip-api", "url": "http://ip-api.com/json" }
        ]
    }"#;

    #[test]
    fn test_load_minimal_config_str() {
        let config = load_config_str(MINIMAL).unwrap();
        assert_eq!(config.failover.max_backup_attempts, 3);
        assert_eq!(config.observers.len(), 1);
        assert!(!config.observers[0].region_keys.is_empty());
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        assert!(matches!(
            load_config_str("{ not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let json = r#"{
            "controller": { "base_url": "http://127.0.0.1:9090" },
            "pool": { "base_url": "https://pool.internal" },
            "observers": []
        }"#;
        assert!(matches!(
            load_config_str(json),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/exitline.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    // Env overrides share process state, so both cases run in one test
    #[test]
    fn test_env_override_max_attempts() {
        let mut config = load_config_str(MINIMAL).unwrap();
        std::env::set_var("EXITLINE_MAX_BACKUP_ATTEMPTS", "7");
        let result = apply_env_overrides(&mut config);
        std::env::remove_var("EXITLINE_MAX_BACKUP_ATTEMPTS");
        result.unwrap();
        assert_eq!(config.failover.max_backup_attempts, 7);

        std::env::set_var("EXITLINE_MAX_BACKUP_ATTEMPTS", "seven");
        let result = apply_env_overrides(&mut config);
        std::env::remove_var("EXITLINE_MAX_BACKUP_ATTEMPTS");
        assert!(matches!(result, Err(ConfigError::EnvError { .. })));
    }
}

//! Configuration types for exitline
//!
//! All process-wide settings (control-plane address, pool service
//! address, observer list, retry budgets) live in one explicit `Config`
//! that is handed to each client at construction. Nothing in the crate
//! reads ambient global state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::region::Region;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Local route-controller (control plane) settings
    pub controller: ControllerConfig,

    /// Fleet-shared backup pool service settings
    pub pool: PoolConfig,

    /// Geolocation observers, queried in listed order
    pub observers: Vec<ObserverConfig>,

    /// Failover retry budgets and timeouts
    #[serde(default)]
    pub failover: FailoverConfig,

    /// Known region catalog; empty disables the membership check
    #[serde(default)]
    pub regions: Vec<RegionEntry>,

    /// Logging configuration, consumed by the embedding service
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        self.pool.validate()?;

        if self.observers.is_empty() {
            return Err(ConfigError::validation(
                "At least one geolocation observer must be configured",
            ));
        }

        let mut tags: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for observer in &self.observers {
            observer.validate()?;
            if !tags.insert(&observer.tag) {
                return Err(ConfigError::validation(format!(
                    "Duplicate observer tag: {}",
                    observer.tag
                )));
            }
        }

        self.failover.validate()?;

        let mut codes: std::collections::HashSet<Region> = std::collections::HashSet::new();
        for entry in &self.regions {
            let region = Region::new(&entry.code)
                .map_err(|e| ConfigError::validation(e.to_string()))?;
            if !codes.insert(region) {
                return Err(ConfigError::validation(format!(
                    "Duplicate region code: {}",
                    entry.code
                )));
            }
        }

        Ok(())
    }

    /// Create a minimal default configuration with the stock observers
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            controller: ControllerConfig::default(),
            pool: PoolConfig::default(),
            observers: ObserverConfig::stock(),
            failover: FailoverConfig::default(),
            regions: Vec::new(),
            log: LogConfig::default(),
        }
    }

    /// Parsed region catalog (validated entries only)
    #[must_use]
    pub fn known_regions(&self) -> Vec<Region> {
        self.regions
            .iter()
            .filter_map(|entry| Region::new(&entry.code).ok())
            .collect()
    }
}

/// Route-controller client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Control-plane base URL (e.g. "http://127.0.0.1:9090")
    pub base_url: String,

    /// Bearer secret for the control-plane API, if it requires one
    #[serde(default)]
    pub secret: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_control_timeout_secs")]
    pub timeout_secs: u64,
}

impl ControllerConfig {
    /// Validate controller configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("controller.base_url", &self.base_url)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "controller.timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Get the per-request timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9090".into(),
            secret: None,
            timeout_secs: default_control_timeout_secs(),
        }
    }
}

/// Backup pool service client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Pool service base URL
    pub base_url: String,

    /// Bearer token for the pool API, if it requires one
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_pool_timeout_secs")]
    pub timeout_secs: u64,
}

impl PoolConfig {
    /// Validate pool configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("pool.base_url", &self.base_url)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "pool.timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Get the per-request timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pool.example.net".into(),
            auth_token: None,
            timeout_secs: default_pool_timeout_secs(),
        }
    }
}

/// One geolocation observer endpoint
///
/// Observers are a tagged list: adding or removing a provider is a
/// configuration change, not a code change.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObserverConfig {
    /// Unique tag for this observer
    pub tag: String,

    /// Endpoint URL returning a JSON object with a region code
    pub url: String,

    /// Payload keys to probe for the region code, in order.
    /// Matched case-insensitively against the payload's top-level keys.
    #[serde(default = "default_region_keys")]
    pub region_keys: Vec<String>,
}

impl ObserverConfig {
    /// Validate observer configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tag.is_empty() {
            return Err(ConfigError::validation("Observer tag cannot be empty"));
        }
        if !self
            .tag
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::validation(format!(
                "Observer tag '{}' contains invalid characters (only alphanumeric, -, _ allowed)",
                self.tag
            )));
        }
        validate_base_url("observer.url", &self.url)?;
        if self.region_keys.is_empty() {
            return Err(ConfigError::validation(format!(
                "Observer '{}' has no region_keys to probe",
                self.tag
            )));
        }
        Ok(())
    }

    /// The stock third-party observer set
    #[must_use]
    pub fn stock() -> Vec<Self> {
        vec![
            Self {
                tag: "ip-api".into(),
                url: "http://ip-api.com/json".into(),
                region_keys: default_region_keys(),
            },
            Self {
                tag: "ipinfo".into(),
                url: "https://ipinfo.io/json".into(),
                region_keys: default_region_keys(),
            },
            Self {
                tag: "ifconfig".into(),
                url: "https://ifconfig.co/json".into(),
                region_keys: default_region_keys(),
            },
        ]
    }
}

/// Failover retry budgets and timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailoverConfig {
    /// Maximum backup routes to try after the primary fails verification
    #[serde(default = "default_max_backup_attempts")]
    pub max_backup_attempts: u32,

    /// Budget for a single observer query, in seconds
    #[serde(default = "default_per_observer_timeout_secs")]
    pub per_observer_timeout_secs: u64,

    /// Budget for one whole verification pass, in seconds
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,

    /// Overall deadline for one allocation run, in seconds.
    /// 0 derives `(1 + max_backup_attempts) * (control + verify timeouts)`.
    #[serde(default)]
    pub overall_timeout_secs: u64,
}

impl FailoverConfig {
    /// Validate failover configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_observer_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "failover.per_observer_timeout_secs must be greater than 0",
            ));
        }
        if self.verify_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "failover.verify_timeout_secs must be greater than 0",
            ));
        }
        if self.verify_timeout_secs < self.per_observer_timeout_secs {
            return Err(ConfigError::validation(
                "failover.verify_timeout_secs must not be below per_observer_timeout_secs",
            ));
        }
        Ok(())
    }

    /// Get the per-observer budget as Duration
    #[must_use]
    pub const fn per_observer_timeout(&self) -> Duration {
        Duration::from_secs(self.per_observer_timeout_secs)
    }

    /// Get the verification-pass budget as Duration
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    /// Overall run deadline, deriving the recommended bound when unset
    #[must_use]
    pub fn overall_timeout(&self, control_timeout: Duration) -> Duration {
        if self.overall_timeout_secs > 0 {
            return Duration::from_secs(self.overall_timeout_secs);
        }
        let per_attempt = control_timeout + self.verify_timeout();
        per_attempt * (1 + self.max_backup_attempts)
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_backup_attempts: default_max_backup_attempts(),
            per_observer_timeout_secs: default_per_observer_timeout_secs(),
            verify_timeout_secs: default_verify_timeout_secs(),
            overall_timeout_secs: 0,
        }
    }
}

/// One entry in the region catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionEntry {
    /// Two-letter region code (e.g. "GB")
    pub code: String,

    /// Human-readable name for operators
    #[serde(default)]
    pub name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
            timestamps: true,
            target: true,
        }
    }
}

fn validate_base_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let uri: http::Uri = url
        .parse()
        .map_err(|e| ConfigError::validation(format!("{field} '{url}' is not a valid URL: {e}")))?;
    match uri.scheme_str() {
        Some("http" | "https") => Ok(()),
        other => Err(ConfigError::validation(format!(
            "{field} '{url}' must use http or https, got {other:?}"
        ))),
    }
}

// Default value functions for serde
const fn default_true() -> bool {
    true
}

const fn default_control_timeout_secs() -> u64 {
    5
}

const fn default_pool_timeout_secs() -> u64 {
    10
}

const fn default_max_backup_attempts() -> u32 {
    3
}

const fn default_per_observer_timeout_secs() -> u64 {
    5
}

const fn default_verify_timeout_secs() -> u64 {
    15
}

fn default_region_keys() -> Vec<String> {
    vec![
        "country".into(),
        "countryCode".into(),
        "country_code".into(),
        "country_iso".into(),
        "cc".into(),
    ]
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_requires_at_least_one_observer() {
        let mut config = Config::default_config();
        config.observers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_observer_tags_rejected() {
        let mut config = Config::default_config();
        let dup = config.observers[0].clone();
        config.observers.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default_config();
        config.controller.base_url = "ftp://127.0.0.1".into();
        assert!(config.validate().is_err());

        config.controller.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_region_catalog_validation() {
        let mut config = Config::default_config();
        config.regions = vec![
            RegionEntry {
                code: "GB".into(),
                name: "United Kingdom".into(),
            },
            RegionEntry {
                code: "gb".into(),
                name: "duplicate in different case".into(),
            },
        ];
        assert!(config.validate().is_err());

        config.regions.pop();
        assert!(config.validate().is_ok());
        assert_eq!(config.known_regions().len(), 1);
    }

    #[test]
    fn test_failover_timeout_relationship() {
        let mut config = Config::default_config();
        config.failover.per_observer_timeout_secs = 30;
        config.failover.verify_timeout_secs = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overall_timeout_derivation() {
        let failover = FailoverConfig::default();
        // (1 + 3 attempts) * (5s control + 15s verify)
        let derived = failover.overall_timeout(Duration::from_secs(5));
        assert_eq!(derived, Duration::from_secs(80));

        let pinned = FailoverConfig {
            overall_timeout_secs: 42,
            ..FailoverConfig::default()
        };
        assert_eq!(
            pinned.overall_timeout(Duration::from_secs(5)),
            Duration::from_secs(42)
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.observers.len(), parsed.observers.len());
        assert_eq!(
            config.failover.max_backup_attempts,
            parsed.failover.max_backup_attempts
        );
    }
}

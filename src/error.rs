//! Error types for exitline
//!
//! Errors are categorized by subsystem. Each category classifies its
//! variants as recoverable or not; the failover orchestrator uses the
//! classification to decide between absorbing a failure into its retry
//! loop and aborting the whole allocation.

use std::io;

use thiserror::Error;

use crate::region::Region;

/// Top-level error type for exitline
#[derive(Debug, Error)]
pub enum ExitLineError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Control-plane client errors
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    /// Backup pool client errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Failover orchestration errors
    #[error("Failover error: {0}")]
    Failover(#[from] crate::failover::FailoverError),
}

impl ExitLineError {
    /// Check if this error is recoverable (the operation can be retried)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(e) => e.is_recoverable(),
            Self::Control(e) => e.is_recoverable(),
            Self::Pool(e) => e.is_recoverable(),
            Self::Failover(e) => e.is_recoverable(),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable override error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are not recoverable without operator intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}

/// Route-controller (local control plane) errors
///
/// The controller client never retries internally; retry policy belongs
/// to the orchestrator, which treats a primary-route control failure as
/// fatal and a backup-route control failure as one lost attempt.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Control plane could not be reached
    #[error("control plane unreachable: {0}")]
    Unreachable(String),

    /// Request exceeded the configured timeout
    #[error("control plane request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Control plane refused the route selection
    #[error("control plane rejected route {route:?} for group {group:?}: {reason}")]
    Rejected {
        group: String,
        route: String,
        reason: String,
    },

    /// The group's active route did not match what was just written
    #[error("group {group:?} reads back active route {actual:?}, expected {expected:?}")]
    ReadbackMismatch {
        group: String,
        expected: String,
        actual: String,
    },

    /// Response body was missing or malformed
    #[error("invalid control plane response: {0}")]
    InvalidResponse(String),

    /// Request could not be formed (empty or malformed group name)
    #[error("invalid control request: {0}")]
    InvalidRequest(String),

    /// Payload serialization failed
    #[error("control payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// HTTP request building failed
    #[error("failed to build control request: {0}")]
    HttpBuild(#[from] hyper::http::Error),
}

impl ControlError {
    /// Check if this error is recoverable
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout { .. })
    }

    /// Create an unreachable error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create a rejection error
    pub fn rejected(
        group: impl Into<String>,
        route: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            group: group.into(),
            route: route.into(),
            reason: reason.into(),
        }
    }
}

/// Backup pool service errors
///
/// `Unavailable` and `Exhausted` both advance the orchestrator's retry
/// loop rather than aborting it: pool state is time-varying, and a route
/// may free up between attempts.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool service could not be reached (transport failure or timeout)
    #[error("backup pool unavailable: {0}")]
    Unavailable(String),

    /// No backup route currently free in the region
    #[error("no backup route available in region {region}")]
    Exhausted { region: Region },

    /// Pool service refused the request
    #[error("backup pool rejected request: {0}")]
    Rejected(String),

    /// Response body was missing or malformed
    #[error("invalid backup pool response: {0}")]
    InvalidResponse(String),

    /// Payload serialization failed
    #[error("pool payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// HTTP request building failed
    #[error("failed to build pool request: {0}")]
    HttpBuild(#[from] hyper::http::Error),
}

impl PoolError {
    /// Check if this error is recoverable
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Exhausted { .. })
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Geolocation observer errors
///
/// Never escape a verification: the verifier skips the observer and
/// moves on. A timeout is skipped silently; transport and payload errors
/// are recorded as evidence for diagnostics.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Observer did not answer within its budget
    #[error("observer timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Transport failure (connect, TLS, non-success status)
    #[error("observer transport failure: {0}")]
    Transport(String),

    /// Payload did not contain a usable region code
    #[error("malformed observer payload: {0}")]
    MalformedPayload(String),
}

impl ObserverError {
    /// Timeouts leave no observation behind; everything else does
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Type alias for Result with ExitLineError
pub type Result<T> = std::result::Result<T, ExitLineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recovery_classification() {
        // Config errors are never recoverable
        assert!(!ConfigError::validation("bad").is_recoverable());

        // Transport-shaped control failures are recoverable
        assert!(ControlError::unreachable("refused").is_recoverable());
        assert!(ControlError::Timeout { timeout_secs: 5 }.is_recoverable());

        // A rejection or read-back mismatch is not
        assert!(!ControlError::rejected("g", "HK_061", "unknown route").is_recoverable());
        assert!(!ControlError::ReadbackMismatch {
            group: "g".into(),
            expected: "HK_061".into(),
            actual: "HK_002".into(),
        }
        .is_recoverable());

        // Both pool failure shapes advance the retry loop
        assert!(PoolError::unavailable("connect refused").is_recoverable());
        assert!(PoolError::Exhausted {
            region: Region::new("HK").unwrap(),
        }
        .is_recoverable());
        assert!(!PoolError::Rejected("bad token".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = ControlError::rejected("relay", "HK_061", "unknown route");
        let msg = err.to_string();
        assert!(msg.contains("relay"));
        assert!(msg.contains("HK_061"));
        assert!(msg.contains("unknown route"));

        let err = PoolError::Exhausted {
            region: Region::new("gb").unwrap(),
        };
        assert!(err.to_string().contains("GB"));
    }

    #[test]
    fn test_observer_error_timeout_classification() {
        assert!(ObserverError::Timeout { timeout_secs: 5 }.is_timeout());
        assert!(!ObserverError::Transport("reset".into()).is_timeout());
        assert!(!ObserverError::MalformedPayload("not json".into()).is_timeout());
    }

    #[test]
    fn test_error_conversion() {
        let err: ExitLineError = ConfigError::validation("invalid").into();
        assert!(!err.is_recoverable());

        let err: ExitLineError = PoolError::unavailable("timeout").into();
        assert!(err.is_recoverable());
    }
}

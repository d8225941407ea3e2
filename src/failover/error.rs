//! Failover orchestration error types

use thiserror::Error;

use super::attempt::AttemptResult;
use crate::error::ControlError;
use crate::region::Region;

/// Terminal outcomes of a failover run that did not produce a route
///
/// Only two shapes are fatal without any retry: precondition violations
/// and a control-plane failure while switching to the primary (an
/// inability to talk to the local control plane would block every
/// backup attempt too). Everything else is absorbed into the retry loop
/// and surfaces here only once the loop is exhausted, the deadline
/// passes, or the caller cancels.
#[derive(Debug, Error)]
pub enum FailoverError {
    /// Rejected before any network call was made
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The control plane could not switch to the primary route
    #[error("control plane failed while switching to the primary route: {0}")]
    ControlPlane(#[from] ControlError),

    /// Every attempt failed; the run is over
    #[error("no verified exit line for region {region} after {count} attempts (primary {primary_route:?})", count = .attempts.len())]
    Exhausted {
        /// Region that could not be confirmed
        region: Region,
        /// The caller's primary route name
        primary_route: String,
        /// Ordered record of every attempt made
        attempts: Vec<AttemptResult>,
    },

    /// The overall run deadline passed mid-flight
    #[error("allocation deadline of {deadline_secs}s exceeded")]
    DeadlineExceeded {
        /// The configured deadline
        deadline_secs: u64,
        /// Attempts completed before the deadline hit
        attempts: Vec<AttemptResult>,
    },

    /// The caller cancelled the run
    #[error("allocation cancelled by caller")]
    Cancelled {
        /// Attempts completed before cancellation
        attempts: Vec<AttemptResult>,
    },
}

impl FailoverError {
    /// The attempt trail, empty for failures that precede any attempt
    #[must_use]
    pub fn attempts(&self) -> &[AttemptResult] {
        match self {
            Self::Precondition(_) | Self::ControlPlane(_) => &[],
            Self::Exhausted { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. }
            | Self::Cancelled { attempts } => attempts,
        }
    }

    /// Check if this error is recoverable (the whole flow may be
    /// invoked again later)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Precondition(_) => false,
            Self::ControlPlane(e) => e.is_recoverable(),
            Self::Exhausted { .. } | Self::DeadlineExceeded { .. } | Self::Cancelled { .. } => true,
        }
    }
}

/// Type alias for Result with FailoverError
pub type FailoverResult<T> = std::result::Result<T, FailoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_trail_access() {
        let err = FailoverError::Precondition("empty route".into());
        assert!(err.attempts().is_empty());

        let err = FailoverError::Exhausted {
            region: Region::new("HK").unwrap(),
            primary_route: "HK_061".into(),
            attempts: vec![AttemptResult::acquire_failed("pool exhausted")],
        };
        assert_eq!(err.attempts().len(), 1);
    }

    #[test]
    fn test_recovery_classification() {
        assert!(!FailoverError::Precondition("empty".into()).is_recoverable());
        assert!(FailoverError::Cancelled { attempts: vec![] }.is_recoverable());
        assert!(FailoverError::Exhausted {
            region: Region::new("HK").unwrap(),
            primary_route: "HK_061".into(),
            attempts: vec![],
        }
        .is_recoverable());

        // Fatal primary-switch rejection is not worth re-running as-is
        let control = ControlError::rejected("relay", "HK_061", "unknown route");
        assert!(!FailoverError::ControlPlane(control).is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = FailoverError::Exhausted {
            region: Region::new("HK").unwrap(),
            primary_route: "HK_061".into(),
            attempts: vec![
                AttemptResult::acquire_failed("pool exhausted"),
                AttemptResult::acquire_failed("pool exhausted"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("HK"));
        assert!(msg.contains("2 attempts"));
        assert!(msg.contains("HK_061"));
    }
}

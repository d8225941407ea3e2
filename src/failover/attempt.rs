//! Attempt bookkeeping
//!
//! Every step of a failover run is recorded so callers and operators
//! can see which stage failed (acquire vs. switch vs. verify vs.
//! occupy) and on which attempt, instead of a bare "no route found".

use std::fmt;

use crate::region::Region;
use crate::verify::VerificationOutcome;

/// Which stage an attempt reached, and how it went
#[derive(Debug, Clone)]
pub enum AttemptStage {
    /// The pool had no route to hand out, or was unreachable
    Acquire {
        /// Pool failure description
        error: String,
    },

    /// The control plane refused to switch to the route
    Switch {
        /// Control failure description
        error: String,
    },

    /// The route was switched and a verification pass completed
    Verify {
        /// Full verification result, pass or fail
        outcome: VerificationOutcome,
    },

    /// Verification passed but the lease could not be recorded
    Occupy {
        /// Pool failure description
        error: String,
    },
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire { error } => write!(f, "acquire failed: {error}"),
            Self::Switch { error } => write!(f, "switch failed: {error}"),
            Self::Verify { outcome } if outcome.passed => write!(f, "verified"),
            Self::Verify { outcome } => write!(
                f,
                "verification failed ({} observations)",
                outcome.evidence.len()
            ),
            Self::Occupy { error } => write!(f, "lease recording failed: {error}"),
        }
    }
}

/// One step in the failover sequence
#[derive(Debug, Clone)]
pub struct AttemptResult {
    /// Route the attempt was made on; `None` when no route was acquired
    pub route: Option<String>,

    /// Whether the route came from the backup pool
    pub is_backup: bool,

    /// The stage reached and its result
    pub stage: AttemptStage,
}

impl AttemptResult {
    /// Record a failed pool acquire
    #[must_use]
    pub fn acquire_failed(error: impl Into<String>) -> Self {
        Self {
            route: None,
            is_backup: true,
            stage: AttemptStage::Acquire {
                error: error.into(),
            },
        }
    }

    /// Record a failed control-plane switch
    #[must_use]
    pub fn switch_failed(route: &str, is_backup: bool, error: impl Into<String>) -> Self {
        Self {
            route: Some(route.to_string()),
            is_backup,
            stage: AttemptStage::Switch {
                error: error.into(),
            },
        }
    }

    /// Record a completed verification pass
    #[must_use]
    pub fn verified(route: &str, is_backup: bool, outcome: VerificationOutcome) -> Self {
        Self {
            route: Some(route.to_string()),
            is_backup,
            stage: AttemptStage::Verify { outcome },
        }
    }

    /// Record a failed lease recording after a passing verify
    #[must_use]
    pub fn occupy_failed(route: &str, error: impl Into<String>) -> Self {
        Self {
            route: Some(route.to_string()),
            is_backup: true,
            stage: AttemptStage::Occupy {
                error: error.into(),
            },
        }
    }

    /// Whether this attempt ended with a confirmed route
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(&self.stage, AttemptStage::Verify { outcome } if outcome.passed)
    }
}

/// A confirmed exit-line allocation
#[derive(Debug, Clone)]
pub struct Allocation {
    /// The route that is now active and verified
    pub route: String,

    /// Region the route was confirmed to egress from
    pub region: Region,

    /// Whether the route came from the backup pool (leased) or was the
    /// caller's primary (not pool-managed)
    pub used_backup: bool,

    /// Ordered record of every attempt made, the winning one last
    pub attempts: Vec<AttemptResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_outcome() -> VerificationOutcome {
        VerificationOutcome {
            passed: true,
            matched_observers: 1,
            evidence: Vec::new(),
        }
    }

    fn fail_outcome() -> VerificationOutcome {
        VerificationOutcome {
            passed: false,
            matched_observers: 0,
            evidence: Vec::new(),
        }
    }

    #[test]
    fn test_passed_classification() {
        assert!(AttemptResult::verified("HK_061", false, pass_outcome()).passed());
        assert!(!AttemptResult::verified("HK_061", false, fail_outcome()).passed());
        assert!(!AttemptResult::acquire_failed("pool exhausted").passed());
        assert!(!AttemptResult::switch_failed("HK_091", true, "refused").passed());
        assert!(!AttemptResult::occupy_failed("HK_091", "pool down").passed());
    }

    #[test]
    fn test_acquire_failure_has_no_route() {
        let attempt = AttemptResult::acquire_failed("pool exhausted");
        assert!(attempt.route.is_none());
        assert!(attempt.is_backup);
    }

    #[test]
    fn test_stage_display() {
        let attempt = AttemptResult::switch_failed("HK_091", true, "HTTP 503");
        assert_eq!(attempt.stage.to_string(), "switch failed: HTTP 503");

        let attempt = AttemptResult::verified("HK_061", false, pass_outcome());
        assert_eq!(attempt.stage.to_string(), "verified");
    }
}

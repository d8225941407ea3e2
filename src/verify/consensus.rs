//! Egress region verification
//!
//! Decides whether the currently active route genuinely egresses from
//! the expected region. Observers are queried sequentially and the first
//! confirmation wins: verification must fail closed (zero confirmations
//! is a FAIL), but observers are occasionally slow or blocked, so
//! requiring full agreement on every call would be slow and brittle.
//! One authoritative confirmation suffices.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::observer::{Observation, Observer};
use crate::region::Region;

/// Aggregated result of one verification pass over a route
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Whether any observer confirmed the expected region
    pub passed: bool,

    /// Number of observers that confirmed (1 on pass, 0 on fail)
    pub matched_observers: usize,

    /// Every completed observation: the confirmation, disagreements,
    /// and in-band observer failures. Timed-out observers leave nothing.
    pub evidence: Vec<Observation>,
}

impl VerificationOutcome {
    /// Regions reported by disagreeing observers, for diagnostics
    #[must_use]
    pub fn disagreements(&self) -> Vec<&Region> {
        self.evidence
            .iter()
            .filter(|o| o.error.is_none())
            .filter_map(|o| o.reported_region.as_ref())
            .collect()
    }
}

/// Verifies egress region via a list of independent observers
///
/// Timeouts are fixed at construction: the per-observer budget bounds a
/// single provider query, the overall budget bounds the whole pass.
pub struct GeoConsensusVerifier {
    observers: Vec<Arc<dyn Observer>>,
    per_observer_timeout: Duration,
    overall_timeout: Duration,
}

impl GeoConsensusVerifier {
    /// Create a verifier over the given observers
    #[must_use]
    pub fn new(
        observers: Vec<Arc<dyn Observer>>,
        per_observer_timeout: Duration,
        overall_timeout: Duration,
    ) -> Self {
        Self {
            observers,
            per_observer_timeout,
            overall_timeout,
        }
    }

    /// Number of configured observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Run one verification pass for the currently active route.
    ///
    /// Observers are queried in order. The first observer whose reported
    /// region equals `expected` (comparison is case-insensitive by
    /// `Region` construction) short-circuits to PASS. A disagreeing
    /// observer is recorded as evidence and the next one is tried. An
    /// observer that times out or fails does not count against either
    /// outcome. Exhausting the list without a confirmation is a FAIL.
    ///
    /// Verification failure is a normal outcome value, never an error.
    pub async fn verify(&self, expected: &Region) -> VerificationOutcome {
        let started = Instant::now();
        let mut evidence = Vec::new();

        for (index, observer) in self.observers.iter().enumerate() {
            let remaining = self.overall_timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(
                    "Verification budget exhausted after {:?}, {} observers unqueried",
                    started.elapsed(),
                    self.observers.len() - index
                );
                break;
            }

            let budget = self.per_observer_timeout.min(remaining);
            let query_start = Instant::now();

            match tokio::time::timeout(budget, observer.observe()).await {
                Err(_) => {
                    warn!(
                        "Observer {} timed out after {:?}, skipping",
                        observer.tag(),
                        budget
                    );
                }
                Ok(Err(e)) if e.is_timeout() => {
                    warn!("Observer {} timed out internally, skipping", observer.tag());
                }
                Ok(Err(e)) => {
                    debug!("Observer {} failed: {}", observer.tag(), e);
                    evidence.push(Observation::errored(
                        observer.tag(),
                        e.to_string(),
                        query_start.elapsed(),
                    ));
                }
                Ok(Ok(region)) => {
                    let latency = query_start.elapsed();
                    let confirmed = region == *expected;
                    evidence.push(Observation::reported(observer.tag(), region, latency));

                    if confirmed {
                        info!(
                            "Observer {} confirmed region {} in {:?}",
                            observer.tag(),
                            expected,
                            latency
                        );
                        return VerificationOutcome {
                            passed: true,
                            matched_observers: 1,
                            evidence,
                        };
                    }

                    debug!(
                        "Observer {} disagrees: reported {:?}, expected {}",
                        observer.tag(),
                        evidence.last().and_then(|o| o.reported_region.as_ref()),
                        expected
                    );
                }
            }
        }

        info!(
            "No observer confirmed region {} ({} observations recorded)",
            expected,
            evidence.len()
        );
        VerificationOutcome {
            passed: false,
            matched_observers: 0,
            evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ObserverError;

    /// Observer that replays a scripted sequence of responses
    struct ScriptedObserver {
        tag: String,
        script: Mutex<VecDeque<Result<&'static str, ObserverError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedObserver {
        fn new(
            tag: &str,
            script: Vec<Result<&'static str, ObserverError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                tag: tag.to_string(),
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Observer for ScriptedObserver {
        fn tag(&self) -> &str {
            &self.tag
        }

        async fn observe(&self) -> Result<Region, ObserverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(code)) => Ok(Region::new(code).unwrap()),
                Some(Err(e)) => Err(e),
                None => Err(ObserverError::Transport("script exhausted".into())),
            }
        }
    }

    /// Observer that never answers within any reasonable budget
    struct StalledObserver;

    #[async_trait]
    impl Observer for StalledObserver {
        fn tag(&self) -> &str {
            "stalled"
        }

        async fn observe(&self) -> Result<Region, ObserverError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Region::new("XX").unwrap())
        }
    }

    fn verifier(observers: Vec<Arc<dyn Observer>>) -> GeoConsensusVerifier {
        GeoConsensusVerifier::new(
            observers,
            Duration::from_millis(50),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_first_match_short_circuits() {
        let first = ScriptedObserver::new("first", vec![Ok("HK")]);
        let second = ScriptedObserver::new("second", vec![Ok("HK")]);
        let v = verifier(vec![first.clone(), second.clone()]);

        let outcome = v.verify(&Region::new("hk").unwrap()).await;

        assert!(outcome.passed);
        assert_eq!(outcome.matched_observers, 1);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0, "match must short-circuit");
    }

    #[tokio::test]
    async fn test_disagreements_collected_as_evidence() {
        let a = ScriptedObserver::new("a", vec![Ok("SG")]);
        let b = ScriptedObserver::new("b", vec![Ok("MY")]);
        let v = verifier(vec![a, b]);

        let outcome = v.verify(&Region::new("HK").unwrap()).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.matched_observers, 0);
        assert_eq!(outcome.evidence.len(), 2);
        let reported: Vec<&str> = outcome
            .disagreements()
            .iter()
            .map(|r| r.as_str())
            .collect();
        assert_eq!(reported, vec!["SG", "MY"]);
    }

    #[tokio::test]
    async fn test_erroring_observer_skipped_but_recorded() {
        let broken = ScriptedObserver::new(
            "broken",
            vec![Err(ObserverError::Transport("HTTP 502".into()))],
        );
        let good = ScriptedObserver::new("good", vec![Ok("HK")]);
        let v = verifier(vec![broken, good]);

        let outcome = v.verify(&Region::new("HK").unwrap()).await;

        assert!(outcome.passed);
        assert_eq!(outcome.evidence.len(), 2);
        assert!(outcome.evidence[0].error.is_some());
    }

    #[tokio::test]
    async fn test_all_timeouts_fail_with_empty_evidence() {
        let v = verifier(vec![
            Arc::new(StalledObserver) as Arc<dyn Observer>,
            Arc::new(StalledObserver),
            Arc::new(StalledObserver),
        ]);

        let outcome = v.verify(&Region::new("HK").unwrap()).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.matched_observers, 0);
        assert!(
            outcome.evidence.is_empty(),
            "timeouts must not leave observations behind"
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_treated_like_timeout_for_outcome() {
        let malformed = ScriptedObserver::new(
            "malformed",
            vec![Err(ObserverError::MalformedPayload("not json".into()))],
        );
        let v = verifier(vec![malformed]);

        let outcome = v.verify(&Region::new("HK").unwrap()).await;

        // Skipped, not failed against: FAIL comes from exhaustion alone
        assert!(!outcome.passed);
        assert_eq!(outcome.evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_overall_budget_stops_the_pass() {
        let slow: Vec<Arc<dyn Observer>> =
            (0..10).map(|_| Arc::new(StalledObserver) as _).collect();
        let v = GeoConsensusVerifier::new(
            slow,
            Duration::from_millis(40),
            Duration::from_millis(100),
        );

        let started = Instant::now();
        let outcome = v.verify(&Region::new("HK").unwrap()).await;

        assert!(!outcome.passed);
        assert!(
            started.elapsed() < Duration::from_millis(400),
            "overall budget must bound the pass"
        );
    }

    #[tokio::test]
    async fn test_region_comparison_is_case_insensitive() {
        let obs = ScriptedObserver::new("obs", vec![Ok("gb")]);
        let v = verifier(vec![obs]);

        let outcome = v.verify(&Region::new("GB").unwrap()).await;
        assert!(outcome.passed);
    }
}

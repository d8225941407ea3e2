//! Failover orchestrator
//!
//! The retry/failover state machine at the heart of the subsystem:
//!
//! ```text
//! Init -> TryingPrimary -> Verifying -> Success
//!                             |
//!                             v
//!                     TryingBackup(n) -> Verifying -> Success
//!                             |
//!                             v  (n = max_backup_attempts)
//!                         Exhausted
//! ```
//!
//! One invocation is one strictly ordered workflow: switch, verify,
//! fail over, each step depending on the previous one's outcome. The
//! orchestrator holds no locks and no shared mutable state; concurrent
//! callers coordinate only through the pool service. Every network call
//! is bounded by a timeout, the whole run by a deadline, and the caller
//! can cancel at any await point.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::attempt::{Allocation, AttemptResult};
use super::error::{FailoverError, FailoverResult};
use crate::config::Config;
use crate::controller::{RouteControl, RouteController, MIN_ROUTE_NAME_LEN};
use crate::error::ConfigError;
use crate::pool::{BackupPool, PoolClient};
use crate::region::Region;
use crate::verify::{GeoConsensusVerifier, HttpObserver, Observer};

/// One exit-line allocation request
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    /// Region the route must be confirmed to egress from
    pub region: Region,

    /// The caller's fixed primary route, tried first
    pub primary_route: String,

    /// Control-plane group the route is selected within
    pub group: String,

    /// Identity of the calling device, used for pool leases
    pub caller_id: String,
}

impl AllocationRequest {
    fn validate(&self) -> FailoverResult<()> {
        if self.primary_route.trim().len() < MIN_ROUTE_NAME_LEN {
            return Err(FailoverError::Precondition(format!(
                "primary route name must be at least {MIN_ROUTE_NAME_LEN} characters"
            )));
        }
        if self.group.trim().is_empty() {
            return Err(FailoverError::Precondition("empty group name".into()));
        }
        if self.caller_id.trim().is_empty() {
            return Err(FailoverError::Precondition("empty caller id".into()));
        }
        Ok(())
    }
}

/// Orchestrator tuning, derived from [`Config`] or built directly
#[derive(Debug, Clone)]
pub struct FailoverSettings {
    /// Backup routes to try after the primary fails verification
    pub max_backup_attempts: u32,

    /// Deadline bounding one whole allocation run
    pub overall_deadline: Duration,

    /// Region catalog; an empty catalog disables the membership check
    pub known_regions: Vec<Region>,
}

impl FailoverSettings {
    /// Derive settings from the process configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_backup_attempts: config.failover.max_backup_attempts,
            overall_deadline: config
                .failover
                .overall_timeout(config.controller.timeout()),
            known_regions: config.known_regions(),
        }
    }
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            max_backup_attempts: 3,
            overall_deadline: Duration::from_secs(80),
            known_regions: Vec::new(),
        }
    }
}

/// Why a run stopped before its work future resolved
enum Interrupt {
    Cancelled,
    Deadline,
}

/// The failover state machine
///
/// Cheap to construct; may be instantiated per call or shared. The
/// clients it composes are `Send + Sync` and shared via `Arc`, so any
/// number of callers can run their own orchestrations concurrently.
pub struct FailoverOrchestrator {
    controller: Arc<dyn RouteControl>,
    pool: Arc<dyn BackupPool>,
    verifier: Arc<GeoConsensusVerifier>,
    settings: FailoverSettings,
}

impl FailoverOrchestrator {
    /// Create an orchestrator over the given clients
    #[must_use]
    pub fn new(
        controller: Arc<dyn RouteControl>,
        pool: Arc<dyn BackupPool>,
        verifier: Arc<GeoConsensusVerifier>,
        settings: FailoverSettings,
    ) -> Self {
        Self {
            controller,
            pool,
            verifier,
            settings,
        }
    }

    /// Build the full production stack from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any section of the configuration is
    /// invalid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let controller = Arc::new(RouteController::new(&config.controller)?);
        let pool = Arc::new(PoolClient::new(&config.pool)?);

        let mut observers: Vec<Arc<dyn Observer>> = Vec::with_capacity(config.observers.len());
        for observer_config in &config.observers {
            observers.push(Arc::new(HttpObserver::new(observer_config)?));
        }

        let verifier = Arc::new(GeoConsensusVerifier::new(
            observers,
            config.failover.per_observer_timeout(),
            config.failover.verify_timeout(),
        ));

        Ok(Self::new(
            controller,
            pool,
            verifier,
            FailoverSettings::from_config(config),
        ))
    }

    /// Allocate a verified exit line for `request`.
    ///
    /// Returns the confirmed active route name plus the full attempt
    /// trail, or a structured failure, never a silent "maybe it
    /// worked".
    ///
    /// # Errors
    ///
    /// See [`FailoverError`] for the failure taxonomy.
    pub async fn allocate(&self, request: &AllocationRequest) -> FailoverResult<Allocation> {
        self.allocate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Allocate with caller-driven cancellation.
    ///
    /// On cancellation, a backup route that was acquired but not yet
    /// marked occupied is handed back to the pool (best-effort) before
    /// the cancellation error is returned, so held-but-unused routes do
    /// not leak.
    ///
    /// # Errors
    ///
    /// See [`FailoverError`] for the failure taxonomy.
    pub async fn allocate_with_cancel(
        &self,
        request: &AllocationRequest,
        cancel: &CancellationToken,
    ) -> FailoverResult<Allocation> {
        request.validate()?;
        self.ensure_region_known(&request.region)?;

        let deadline = Instant::now() + self.settings.overall_deadline;
        let mut attempts: Vec<AttemptResult> = Vec::new();

        info!(
            "Allocating exit line for region {} (primary {:?}, group {:?})",
            request.region, request.primary_route, request.group
        );

        // A control-plane failure on the primary is fatal: if the local
        // control plane cannot switch routes, no backup will fare better.
        match self
            .bounded(
                cancel,
                deadline,
                self.controller
                    .set_active(&request.group, &request.primary_route),
            )
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Primary switch failed, aborting allocation: {}", e);
                return Err(FailoverError::ControlPlane(e));
            }
            Err(why) => return Err(self.interrupted(why, attempts)),
        }

        let outcome = match self
            .bounded(cancel, deadline, self.verifier.verify(&request.region))
            .await
        {
            Ok(outcome) => outcome,
            Err(why) => return Err(self.interrupted(why, attempts)),
        };
        let primary_passed = outcome.passed;
        attempts.push(AttemptResult::verified(
            &request.primary_route,
            false,
            outcome,
        ));

        if primary_passed {
            info!(
                "Primary route {:?} confirmed in region {}",
                request.primary_route, request.region
            );
            return Ok(Allocation {
                route: request.primary_route.clone(),
                region: request.region.clone(),
                used_backup: false,
                attempts,
            });
        }

        // Free the failed primary for other callers before hunting for
        // a backup. Best-effort: a release failure is logged, never
        // aborts the failover.
        self.release_quietly(&request.primary_route, request).await;

        for attempt_no in 1..=self.settings.max_backup_attempts {
            debug!(
                "Backup attempt {}/{} for region {}",
                attempt_no, self.settings.max_backup_attempts, request.region
            );

            let route = match self
                .bounded(
                    cancel,
                    deadline,
                    self.pool.acquire(&request.region, &request.caller_id),
                )
                .await
            {
                Ok(Ok(route)) => route,
                Ok(Err(e)) => {
                    // Pool state changes between polls; one refusal or
                    // outage does not end the loop.
                    debug!("Backup acquire {} failed: {}", attempt_no, e);
                    attempts.push(AttemptResult::acquire_failed(e.to_string()));
                    continue;
                }
                Err(why) => return Err(self.interrupted(why, attempts)),
            };

            // From here until the lease is recorded (or the attempt
            // concludes on its own terms) an interrupt must hand the
            // route back to the pool.
            match self
                .bounded(
                    cancel,
                    deadline,
                    self.controller.set_active(&request.group, &route),
                )
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Switch to backup {:?} failed: {}", route, e);
                    attempts.push(AttemptResult::switch_failed(&route, true, e.to_string()));
                    continue; // no lease was recorded, nothing to release
                }
                Err(why) => {
                    self.release_quietly(&route, request).await;
                    return Err(self.interrupted(why, attempts));
                }
            }

            let outcome = match self
                .bounded(cancel, deadline, self.verifier.verify(&request.region))
                .await
            {
                Ok(outcome) => outcome,
                Err(why) => {
                    self.release_quietly(&route, request).await;
                    return Err(self.interrupted(why, attempts));
                }
            };

            if !outcome.passed {
                // Never marked occupied, so no lease exists to release
                debug!("Backup {:?} failed verification", route);
                attempts.push(AttemptResult::verified(&route, true, outcome));
                continue;
            }

            match self
                .bounded(
                    cancel,
                    deadline,
                    self.pool
                        .mark_occupied(&route, &request.region, &request.caller_id),
                )
                .await
            {
                Ok(Ok(())) => {
                    attempts.push(AttemptResult::verified(&route, true, outcome));
                    info!(
                        "Backup route {:?} confirmed and leased in region {}",
                        route, request.region
                    );
                    return Ok(Allocation {
                        route,
                        region: request.region.clone(),
                        used_backup: true,
                        attempts,
                    });
                }
                Ok(Err(e)) => {
                    // Reporting success without a recorded lease would
                    // let a second caller double-book this route; keep
                    // looking instead.
                    warn!("Could not record lease on {:?}: {}", route, e);
                    attempts.push(AttemptResult::occupy_failed(&route, e.to_string()));
                    continue;
                }
                Err(why) => {
                    self.release_quietly(&route, request).await;
                    return Err(self.interrupted(why, attempts));
                }
            }
        }

        warn!(
            "Exhausted {} backup attempts for region {}",
            self.settings.max_backup_attempts, request.region
        );
        Err(FailoverError::Exhausted {
            region: request.region.clone(),
            primary_route: request.primary_route.clone(),
            attempts,
        })
    }

    fn ensure_region_known(&self, region: &Region) -> FailoverResult<()> {
        if self.settings.known_regions.is_empty() || self.settings.known_regions.contains(region) {
            return Ok(());
        }
        Err(FailoverError::Precondition(format!(
            "region {region} is not in the configured catalog"
        )))
    }

    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        deadline: Instant,
        work: impl Future<Output = T>,
    ) -> Result<T, Interrupt> {
        tokio::select! {
            () = cancel.cancelled() => Err(Interrupt::Cancelled),
            () = tokio::time::sleep_until(deadline) => Err(Interrupt::Deadline),
            out = work => Ok(out),
        }
    }

    fn interrupted(&self, why: Interrupt, attempts: Vec<AttemptResult>) -> FailoverError {
        match why {
            Interrupt::Cancelled => {
                warn!("Allocation cancelled after {} attempts", attempts.len());
                FailoverError::Cancelled { attempts }
            }
            Interrupt::Deadline => {
                warn!(
                    "Allocation deadline of {:?} exceeded after {} attempts",
                    self.settings.overall_deadline,
                    attempts.len()
                );
                FailoverError::DeadlineExceeded {
                    deadline_secs: self.settings.overall_deadline.as_secs(),
                    attempts,
                }
            }
        }
    }

    async fn release_quietly(&self, route: &str, request: &AllocationRequest) {
        if let Err(e) = self
            .pool
            .release(route, &request.region, &request.caller_id)
            .await
        {
            warn!("Failed to release route {:?} back to the pool: {}", route, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(primary: &str) -> AllocationRequest {
        AllocationRequest {
            region: Region::new("HK").unwrap(),
            primary_route: primary.into(),
            group: "relay".into(),
            caller_id: "device-17".into(),
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(request("HK_061").validate().is_ok());
        assert!(request("").validate().is_err());
        assert!(request("ab").validate().is_err());

        let mut r = request("HK_061");
        r.group = "  ".into();
        assert!(r.validate().is_err());

        let mut r = request("HK_061");
        r.caller_id = String::new();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::default_config();
        let settings = FailoverSettings::from_config(&config);
        assert_eq!(settings.max_backup_attempts, 3);
        // (1 + 3) * (5s control + 15s verify)
        assert_eq!(settings.overall_deadline, Duration::from_secs(80));
        assert!(settings.known_regions.is_empty());
    }

    #[test]
    fn test_from_config_builds_full_stack() {
        let orchestrator = FailoverOrchestrator::from_config(&Config::default_config()).unwrap();
        assert_eq!(orchestrator.verifier.observer_count(), 3);
    }
}

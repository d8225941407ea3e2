//! Backup pool client
//!
//! Mediates the fleet-shared inventory of backup routes. The pool
//! service is the single source of truth for occupancy: this client
//! never caches availability or guesses locally, so two concurrent
//! callers can only be deconflicted in one place.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, Uri};
use http_body_util::Full;
use tracing::{debug, info};

use super::api::{AvailableBackupResponse, OccupancyRequest, OccupancyResponse};
use crate::config::PoolConfig;
use crate::error::{ConfigError, PoolError};
use crate::http::{build_client, send, trim_base, HttpClient, TransportFailure};
use crate::region::Region;

/// Pool operations needed by the failover orchestrator
///
/// Implemented by [`PoolClient`] over HTTP; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait BackupPool: Send + Sync {
    /// Ask for one currently-unoccupied backup route in `region`.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Exhausted` when no route is free and
    /// `PoolError::Unavailable` on transport failure; both advance the
    /// orchestrator's retry loop rather than aborting it.
    async fn acquire(&self, region: &Region, caller: &str) -> Result<String, PoolError>;

    /// Record a lease for `route`. Called only after the route passed
    /// verification, converting a tentative use into recorded occupancy.
    ///
    /// # Errors
    ///
    /// Returns `PoolError` if the pool is unreachable or refuses the
    /// report.
    async fn mark_occupied(
        &self,
        route: &str,
        region: &Region,
        caller: &str,
    ) -> Result<(), PoolError>;

    /// Clear any lease on `route` so other callers may use it.
    ///
    /// Tolerant by contract: releasing a route that was never occupied
    /// is a pool-side no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns `PoolError` if the pool is unreachable or refuses the
    /// report.
    async fn release(&self, route: &str, region: &Region, caller: &str) -> Result<(), PoolError>;
}

/// HTTP client for the backup pool service
pub struct PoolClient {
    base: String,
    auth_token: Option<String>,
    timeout: std::time::Duration,
    client: HttpClient,
}

impl std::fmt::Debug for PoolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolClient")
            .field("base", &self.base)
            .field("timeout", &self.timeout)
            .field("authenticated", &self.auth_token.is_some())
            .finish()
    }
}

impl PoolClient {
    /// Create a new pool client
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the pool configuration is invalid.
    pub fn new(config: &PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            base: trim_base(&config.base_url),
            auth_token: config.auth_token.clone(),
            timeout: config.timeout(),
            client: build_client(),
        })
    }

    fn authorize(&self, builder: http::request::Builder) -> http::request::Builder {
        match &self.auth_token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    fn map_transport(failure: TransportFailure) -> PoolError {
        match failure {
            TransportFailure::TimedOut { timeout_secs } => {
                PoolError::unavailable(format!("request timed out after {timeout_secs}s"))
            }
            TransportFailure::Failed(reason) => PoolError::unavailable(reason),
        }
    }

    async fn report_occupancy(
        &self,
        route: &str,
        region: &Region,
        caller: &str,
        status: bool,
    ) -> Result<(), PoolError> {
        let uri: Uri = format!("{}/occupancy", self.base)
            .parse()
            .map_err(|e| PoolError::InvalidResponse(format!("invalid occupancy URI: {e}")))?;

        let body = serde_json::to_vec(&OccupancyRequest {
            caller,
            line_name: route,
            status,
            region: region.as_str(),
        })?;

        let request = self
            .authorize(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json"),
            )
            .body(Full::new(Bytes::from(body)))?;

        let (http_status, bytes) = send(&self.client, request, self.timeout)
            .await
            .map_err(Self::map_transport)?;

        if !http_status.is_success() {
            return Err(PoolError::unavailable(format!(
                "HTTP {http_status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        let response: OccupancyResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PoolError::InvalidResponse(e.to_string()))?;

        if !response.success {
            return Err(PoolError::Rejected(
                response.error.unwrap_or_else(|| "unspecified".into()),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl BackupPool for PoolClient {
    async fn acquire(&self, region: &Region, caller: &str) -> Result<String, PoolError> {
        let uri: Uri = format!(
            "{}/available-backup?region={}&caller={}",
            self.base,
            region.as_str(),
            caller
        )
        .parse()
        .map_err(|e| PoolError::InvalidResponse(format!("invalid acquire URI: {e}")))?;

        let request = self
            .authorize(Request::builder().method(Method::GET).uri(uri))
            .body(Full::new(Bytes::new()))?;

        debug!("Requesting backup route in region {} for {}", region, caller);

        let (status, bytes) = send(&self.client, request, self.timeout)
            .await
            .map_err(Self::map_transport)?;

        if !status.is_success() {
            return Err(PoolError::unavailable(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        let response: AvailableBackupResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PoolError::InvalidResponse(e.to_string()))?;

        if !response.success {
            debug!(
                "Pool has no free route in {}: {}",
                region,
                response.error.as_deref().unwrap_or("unspecified")
            );
            return Err(PoolError::Exhausted {
                region: region.clone(),
            });
        }

        match response.line_name {
            Some(route) if !route.is_empty() => {
                info!("Pool granted backup route {:?} in region {}", route, region);
                Ok(route)
            }
            _ => Err(PoolError::InvalidResponse(
                "success reply without a line_name".into(),
            )),
        }
    }

    async fn mark_occupied(
        &self,
        route: &str,
        region: &Region,
        caller: &str,
    ) -> Result<(), PoolError> {
        info!("Marking route {:?} occupied in region {}", route, region);
        self.report_occupancy(route, region, caller, true).await
    }

    async fn release(&self, route: &str, region: &Region, caller: &str) -> Result<(), PoolError> {
        info!("Releasing route {:?} in region {}", route, region);
        self.report_occupancy(route, region, caller, false).await
    }
}

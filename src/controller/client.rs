//! Route-controller client
//!
//! Thin client for the local control plane: apply a route selection to a
//! named group and read it back. The client never retries: retry policy
//! belongs to the failover orchestrator, which treats a control failure
//! on the primary route as fatal and on a backup route as one lost
//! attempt.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, Uri};
use http_body_util::Full;
use tracing::{debug, info};

use super::api::{GroupSnapshot, RouteSelection};
use crate::config::ControllerConfig;
use crate::error::{ConfigError, ControlError};
use crate::http::{build_client, send, trim_base, HttpClient, TransportFailure};

/// Minimum length of a route name accepted by the control plane
pub const MIN_ROUTE_NAME_LEN: usize = 3;

/// Control-plane operations needed by the failover orchestrator
///
/// Implemented by [`RouteController`] over HTTP; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait RouteControl: Send + Sync {
    /// Make `route` the active route of `group`.
    ///
    /// The write is only trusted once the group reads back the same
    /// route name; an absent or different `now` field is a failure.
    ///
    /// # Errors
    ///
    /// Returns `ControlError` if the control plane is unreachable,
    /// rejects the selection, or reads back a different route.
    async fn set_active(&self, group: &str, route: &str) -> Result<(), ControlError>;

    /// Read the active route name of `group`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError` if the control plane is unreachable or the
    /// group reports no active route.
    async fn get_active(&self, group: &str) -> Result<String, ControlError>;
}

/// HTTP client for the local control plane
///
/// # Thread Safety
///
/// The client is stateless apart from its connection pool and can be
/// shared across tasks behind an `Arc`.
pub struct RouteController {
    base: String,
    secret: Option<String>,
    timeout: std::time::Duration,
    client: HttpClient,
}

impl std::fmt::Debug for RouteController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteController")
            .field("base", &self.base)
            .field("timeout", &self.timeout)
            .field("authenticated", &self.secret.is_some())
            .finish()
    }
}

impl RouteController {
    /// Create a new control-plane client
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the controller configuration is invalid.
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            base: trim_base(&config.base_url),
            secret: config.secret.clone(),
            timeout: config.timeout(),
            client: build_client(),
        })
    }

    fn group_uri(&self, group: &str) -> Result<Uri, ControlError> {
        if group.trim().is_empty() {
            return Err(ControlError::InvalidRequest("empty group name".into()));
        }
        let raw = format!("{}/proxies/{}", self.base, group.trim());
        raw.parse().map_err(|e| {
            ControlError::InvalidRequest(format!("group {group:?} forms an invalid URI: {e}"))
        })
    }

    fn authorize(&self, builder: http::request::Builder) -> http::request::Builder {
        match &self.secret {
            Some(secret) => builder.header(AUTHORIZATION, format!("Bearer {secret}")),
            None => builder,
        }
    }

    fn map_transport(failure: TransportFailure) -> ControlError {
        match failure {
            TransportFailure::TimedOut { timeout_secs } => ControlError::Timeout { timeout_secs },
            TransportFailure::Failed(reason) => ControlError::Unreachable(reason),
        }
    }
}

#[async_trait]
impl RouteControl for RouteController {
    async fn set_active(&self, group: &str, route: &str) -> Result<(), ControlError> {
        let route = route.trim();
        if route.len() < MIN_ROUTE_NAME_LEN {
            return Err(ControlError::rejected(
                group,
                route,
                format!("route name must be at least {MIN_ROUTE_NAME_LEN} characters"),
            ));
        }

        let uri = self.group_uri(group)?;
        let body = serde_json::to_vec(&RouteSelection { name: route })?;
        let request = self
            .authorize(
                Request::builder()
                    .method(Method::PUT)
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json"),
            )
            .body(Full::new(Bytes::from(body)))?;

        debug!("Switching group {:?} to route {:?}", group, route);

        let (status, bytes) = send(&self.client, request, self.timeout)
            .await
            .map_err(Self::map_transport)?;

        if !status.is_success() {
            return Err(ControlError::rejected(
                group,
                route,
                format!("HTTP {status}: {}", String::from_utf8_lossy(&bytes)),
            ));
        }

        // The acknowledgement alone is not trusted: read the group back
        // and require `now` to match what was just written.
        let active = self.get_active(group).await?;
        if active != route {
            return Err(ControlError::ReadbackMismatch {
                group: group.to_string(),
                expected: route.to_string(),
                actual: active,
            });
        }

        info!("Group {:?} now active on route {:?}", group, route);
        Ok(())
    }

    async fn get_active(&self, group: &str) -> Result<String, ControlError> {
        let uri = self.group_uri(group)?;
        let request = self
            .authorize(Request::builder().method(Method::GET).uri(uri))
            .body(Full::new(Bytes::new()))?;

        let (status, bytes) = send(&self.client, request, self.timeout)
            .await
            .map_err(Self::map_transport)?;

        if !status.is_success() {
            return Err(ControlError::InvalidResponse(format!(
                "HTTP {status} reading group {group:?}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        let snapshot: GroupSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| ControlError::InvalidResponse(e.to_string()))?;

        match snapshot.now {
            Some(now) if !now.is_empty() => Ok(now),
            _ => Err(ControlError::InvalidResponse(format!(
                "group {group:?} reports no active route"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_controller() -> RouteController {
        RouteController::new(&ControllerConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_short_route_name_rejected_before_any_request() {
        let controller = test_controller();
        let err = controller.set_active("relay", "ab").await.unwrap_err();
        assert!(matches!(err, ControlError::Rejected { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_empty_group_rejected() {
        let controller = test_controller();
        let err = controller.get_active("  ").await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidRequest(_)));
    }

    #[test]
    fn test_group_uri_construction() {
        let controller = test_controller();
        let uri = controller.group_uri("relay").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:9090/proxies/relay");
    }

    #[test]
    fn test_invalid_controller_config_rejected() {
        let config = ControllerConfig {
            base_url: "not a url".into(),
            ..ControllerConfig::default()
        };
        assert!(RouteController::new(&config).is_err());
    }
}

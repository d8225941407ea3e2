//! Geolocation observers
//!
//! An observer is an independent third-party endpoint reporting the
//! apparent geographic origin of current egress traffic. Providers
//! disagree on payload shape, so extraction probes a configured list of
//! keys case-insensitively and accepts the first plausible two-letter
//! code.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::ACCEPT;
use http::{Method, Request, Uri};
use http_body_util::Full;
use serde_json::Value;
use tracing::debug;

use crate::config::ObserverConfig;
use crate::error::{ConfigError, ObserverError};
use crate::http::{build_client, send, HttpClient, TransportFailure};
use crate::region::Region;

/// One recorded external check result. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Tag of the observer that produced this result
    pub observer: String,

    /// Region the observer reported, when it reported one
    pub reported_region: Option<Region>,

    /// How long the observer took to answer
    pub latency: Duration,

    /// In-band failure (transport error, unusable payload)
    pub error: Option<String>,
}

impl Observation {
    /// Record a reported region
    #[must_use]
    pub fn reported(observer: &str, region: Region, latency: Duration) -> Self {
        Self {
            observer: observer.to_string(),
            reported_region: Some(region),
            latency,
            error: None,
        }
    }

    /// Record an in-band observer failure
    #[must_use]
    pub fn errored(observer: &str, error: String, latency: Duration) -> Self {
        Self {
            observer: observer.to_string(),
            reported_region: None,
            latency,
            error: Some(error),
        }
    }
}

/// A single geolocation provider
///
/// Implementations must not retry internally; the verifier decides what
/// a failed observation means for the route attempt.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Unique tag identifying this observer in evidence and logs
    fn tag(&self) -> &str;

    /// Query the provider for the apparent egress region.
    ///
    /// # Errors
    ///
    /// Returns `ObserverError` on transport failure or when the payload
    /// carries no usable region code.
    async fn observe(&self) -> Result<Region, ObserverError>;
}

/// HTTP geolocation observer
pub struct HttpObserver {
    tag: String,
    uri: Uri,
    region_keys: Vec<String>,
    client: HttpClient,
}

impl std::fmt::Debug for HttpObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObserver")
            .field("tag", &self.tag)
            .field("uri", &self.uri.to_string())
            .finish()
    }
}

impl HttpObserver {
    /// Create an observer from its configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the observer configuration is invalid.
    pub fn new(config: &ObserverConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let uri: Uri = config.url.parse().map_err(|e| {
            ConfigError::validation(format!("observer URL '{}' is invalid: {e}", config.url))
        })?;

        Ok(Self {
            tag: config.tag.clone(),
            uri,
            region_keys: config.region_keys.clone(),
            client: build_client(),
        })
    }
}

#[async_trait]
impl Observer for HttpObserver {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn observe(&self) -> Result<Region, ObserverError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .header(ACCEPT, "application/json")
            .body(Full::new(Bytes::new()))
            .map_err(|e| ObserverError::Transport(e.to_string()))?;

        // Transport is bounded by the verifier's per-observer budget; an
        // hour here is a backstop, not the operative timeout.
        let (status, bytes) = send(&self.client, request, Duration::from_secs(3600))
            .await
            .map_err(|f| match f {
                TransportFailure::TimedOut { timeout_secs } => {
                    ObserverError::Timeout { timeout_secs }
                }
                TransportFailure::Failed(reason) => ObserverError::Transport(reason),
            })?;

        if !status.is_success() {
            return Err(ObserverError::Transport(format!("HTTP {status}")));
        }

        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ObserverError::MalformedPayload(e.to_string()))?;

        match extract_region(&payload, &self.region_keys) {
            Some(region) => {
                debug!("Observer {} reports region {}", self.tag, region);
                Ok(region)
            }
            None => Err(ObserverError::MalformedPayload(format!(
                "no region code under keys {:?}",
                self.region_keys
            ))),
        }
    }
}

/// Pull a plausible region code out of a provider payload.
///
/// Keys are probed in configured order against the payload's top-level
/// object, matched case-insensitively. A value only counts when it is a
/// two-letter alphabetic string, which skips long-form names like
/// `"country": "United Kingdom"` in favor of `"countryCode": "GB"`.
pub(crate) fn extract_region(payload: &Value, keys: &[String]) -> Option<Region> {
    let object = payload.as_object()?;

    for key in keys {
        for (name, value) in object {
            if !name.eq_ignore_ascii_case(key) {
                continue;
            }
            let Some(raw) = value.as_str() else { continue };
            let trimmed = raw.trim();
            if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                if let Ok(region) = Region::new(trimmed) {
                    return Some(region);
                }
            }
        }
    }

    None
}

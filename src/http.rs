//! Shared HTTP plumbing for the control-plane, pool, and observer clients
//!
//! One connector stack serves all three: the control plane is plain
//! HTTP on localhost while the pool and observers are HTTPS, so the
//! connector accepts both schemes. Every request is bounded by the
//! caller's timeout; nothing here blocks indefinitely.

use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Client type shared by the exitline HTTP clients
pub(crate) type HttpClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Transport-level failure, classified for per-client error mapping
#[derive(Debug)]
pub(crate) enum TransportFailure {
    /// The request did not complete within the budget
    TimedOut { timeout_secs: u64 },
    /// Connect, TLS, or body-read failure
    Failed(String),
}

/// Build the shared HTTPS-capable client
pub(crate) fn build_client() -> HttpClient {
    // Install rustls crypto provider if not already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .build();

    Client::builder(TokioExecutor::new()).build(https)
}

/// Normalize a base URL for path concatenation (no trailing slash)
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send a request and collect the response body, bounded by `timeout`
pub(crate) async fn send(
    client: &HttpClient,
    request: Request<Full<Bytes>>,
    timeout: Duration,
) -> Result<(StatusCode, Bytes), TransportFailure> {
    let response = tokio::time::timeout(timeout, client.request(request))
        .await
        .map_err(|_| TransportFailure::TimedOut {
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| TransportFailure::Failed(e.to_string()))?;

    let (parts, body) = response.into_parts();

    let bytes = tokio::time::timeout(timeout, body.collect())
        .await
        .map_err(|_| TransportFailure::TimedOut {
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| TransportFailure::Failed(e.to_string()))?
        .to_bytes();

    Ok((parts.status, bytes))
}

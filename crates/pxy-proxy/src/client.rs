//! Upstream HTTP client

use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderMap, Request, Response};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ProxyError;

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Check whether a header only applies to a single hop
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// A one-shot HTTP round trip to an upstream target.
///
/// The request URI must be absolute. Implementations return the complete
/// response with its body fully buffered.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ProxyError>;
}

/// Upstream client configuration
#[derive(Clone, Debug, Default)]
pub struct UpstreamClientConfig {
    /// Total timeout for a single round trip (none by default)
    pub timeout: Option<Duration>,
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
}

/// reqwest-backed upstream client
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    /// Create a new upstream client
    pub fn new(config: UpstreamClientConfig) -> Result<Self, ProxyError> {
        // Redirects are relayed to the caller, not followed
        let mut builder = Client::builder().redirect(reqwest::redirect::Policy::none());

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        info!("Created upstream client (timeout: {:?})", config.timeout);

        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for UpstreamClient {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ProxyError> {
        let (parts, body) = request.into_parts();

        if parts.uri.scheme().is_none() || parts.uri.authority().is_none() {
            return Err(ProxyError::InvalidRequest(format!(
                "upstream URI must be absolute: {}",
                parts.uri
            )));
        }

        let url = parts.uri.to_string();
        debug!("Forwarding {} {}", parts.method, url);

        let response = self
            .client
            .request(parts.method, &url)
            .headers(strip_hop_by_hop(&parts.headers))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let version = response.version();
        let headers = strip_hop_by_hop(response.headers());
        let body = response.bytes().await?;

        debug!("Upstream {} answered {} ({} bytes)", url, status, body.len());

        let mut forwarded = Response::new(body);
        *forwarded.status_mut() = status;
        *forwarded.version_mut() = version;
        *forwarded.headers_mut() = headers;

        Ok(forwarded)
    }
}

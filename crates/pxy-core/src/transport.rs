//! Cache-aside transport
//!
//! Serves requests from the cache store when a live entry exists for the
//! request path; otherwise resolves the target through the resource trie,
//! forwards upstream and stores the serialized response.

use bytes::Bytes;
use chrono::Utc;
use http::header::{HOST, HeaderName, HeaderValue};
use http::{Request, Response, Uri};
use pxy_proxy::{Upstream, decode_response, encode_response};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheLookup, CacheStore};
use crate::config::TargetConfig;
use crate::error::CoreError;
use crate::resource::ResourceTrie;

static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// HTTP transport that checks the cache before going upstream
pub struct CacheTransport {
    cache: CacheStore,
    trie: Arc<ResourceTrie>,
    upstream: Arc<dyn Upstream>,
}

impl CacheTransport {
    pub fn new(cache: CacheStore, trie: Arc<ResourceTrie>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            cache,
            trie,
            upstream,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Top-level configuration, independent of any request path
    pub fn default_config(&self) -> &Arc<TargetConfig> {
        self.trie.default_config()
    }

    /// Serve a request, from cache when possible.
    ///
    /// The cache key is the request path alone; the query string is
    /// forwarded upstream but does not distinguish cache entries.
    pub async fn round_trip(
        &self,
        request: Request<Bytes>,
        remote: Option<SocketAddr>,
    ) -> Result<Response<Bytes>, CoreError> {
        let path = request.uri().path().to_string();
        let caller = remote.map_or_else(|| "unknown".to_string(), |addr| addr.to_string());

        // Data may be cleared by a concurrent expiring lookup; treat that as a miss
        if let CacheLookup::Hit(item) = self.cache.get(&path).await
            && let Some(data) = item.data()
        {
            info!("Cache hit for {} from {}", path, caller);
            metrics::counter!("pxy_cache_hits_total").increment(1);
            return Ok(decode_response(data)?);
        }

        metrics::counter!("pxy_cache_misses_total").increment(1);

        let config = self.trie.lookup(&path);
        let request = rewrite_request(request, &config)?;
        let url = request.uri().to_string();

        info!("Cache miss, forwarding to {} for {}", url, caller);

        let response = self.upstream.round_trip(request).await?;

        let data = encode_response(&response);
        let expiration = Utc::now().timestamp() + config.ttl;
        debug!("Storing {} bytes for {} (ttl: {}s)", data.len(), path, config.ttl);
        self.cache.set(path, data, expiration).await;

        info!("Cache added for {}", url);
        metrics::counter!("pxy_cache_stores_total").increment(1);

        Ok(response)
    }
}

/// Point a request at the resolved upstream target.
///
/// The original `Host` is preserved in `X-Forwarded-Host`.
fn rewrite_request(
    request: Request<Bytes>,
    config: &TargetConfig,
) -> Result<Request<Bytes>, CoreError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string();

    let invalid_target = |e: &dyn std::fmt::Display| {
        CoreError::InvalidTarget(format!(
            "{}://{}: {}",
            config.target_scheme, config.target_host, e
        ))
    };

    let original_host = parts
        .headers
        .get(HOST)
        .cloned()
        .or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        });

    parts.uri = Uri::builder()
        .scheme(config.target_scheme.as_str())
        .authority(config.target_host.as_str())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| invalid_target(&e))?;

    if let Some(host) = original_host {
        parts.headers.insert(X_FORWARDED_HOST.clone(), host);
    }
    parts.headers.insert(
        HOST,
        HeaderValue::from_str(&config.target_host).map_err(|e| invalid_target(&e))?,
    );

    Ok(Request::from_parts(parts, body))
}

//! Cache invalidation via the FLUSH verb

use axum::Json;
use axum::http::HeaderMap;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::BasicCredentials;
use crate::state::AppState;

/// Body returned by a flush request
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FlushResponse {
    pub flushed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Random delay in `[0, max]`, blunting timing of credential guessing
fn auth_failure_delay(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

/// Remove the cache entry for `path` if the caller holds the top-level credentials.
///
/// Credentials are checked against the default configuration's auth, not
/// the configuration resolved for the path.
pub(super) async fn flush(state: &AppState, headers: &HeaderMap, path: &str) -> Json<FlushResponse> {
    let auth = &state.transport.default_config().auth;
    let authorized = BasicCredentials::from_headers(headers).is_some_and(|c| c.matches(auth));

    if !authorized {
        warn!("Flush rejected for {}: auth failed", path);
        tokio::time::sleep(auth_failure_delay(state.auth_failure_delay)).await;
        return Json(FlushResponse {
            flushed: false,
            error: Some("auth failed".to_string()),
        });
    }

    let removed = state.transport.cache().delete(path).await;
    info!("Flushed {} (entry present: {})", path, removed.is_some());

    Json(FlushResponse {
        flushed: true,
        error: None,
    })
}

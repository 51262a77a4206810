//! Proxied GET requests

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http;
use axum::response::Response;
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest inbound request body buffered for forwarding
const MAX_REQUEST_BODY: usize = 16 * 1024 * 1024;

/// Hand a request to the cache-aside transport
pub(super) async fn forward(
    state: &AppState,
    request: Request,
    remote: Option<SocketAddr>,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let response = state
        .transport
        .round_trip(http::Request::from_parts(parts, body), remote)
        .await?;

    Ok(response.map(Body::from))
}

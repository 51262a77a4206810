//! API routes

mod flush;
mod proxy;

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

pub use flush::FlushResponse;

/// Non-standard method that invalidates the cache entry for a path
pub const FLUSH_METHOD: &str = "FLUSH";

/// Route every request by method: GET is proxied, FLUSH invalidates
async fn dispatch(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    info!("Request method: {}", request.method());

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if *request.method() == Method::GET {
        return proxy::forward(&state, request, remote).await;
    }

    if request.method().as_str() == FLUSH_METHOD {
        let (parts, _body) = request.into_parts();
        let response = flush::flush(&state, &parts.headers, parts.uri.path()).await;
        return Ok(response.into_response());
    }

    Err(ApiError::MethodNotAllowed(request.method().to_string()))
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

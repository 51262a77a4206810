//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pxy_core::CoreError;
use pxy_proxy::ProxyError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Core(e) => match e {
                CoreError::Proxy(ProxyError::Http(_)) | CoreError::Proxy(ProxyError::InvalidResponse(_)) => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        };

        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Proxy error: {0}")]
    Proxy(#[from] pxy_proxy::ProxyError),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}

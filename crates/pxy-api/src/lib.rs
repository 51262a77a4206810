//! pxy HTTP API
//!
//! This crate provides the axum router in front of the cache-aside
//! transport: proxied GET requests and the authenticated FLUSH verb.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{FLUSH_METHOD, create_router};
pub use state::AppState;

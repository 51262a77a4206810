//! pxy upstream proxy
//!
//! This crate provides the client used to forward requests to upstream
//! targets and the wire codec that turns a complete HTTP response into
//! the opaque byte sequence stored by the cache.

pub mod client;
pub mod error;
pub mod wire;

pub use client::{Upstream, UpstreamClient, UpstreamClientConfig, is_hop_by_hop};
pub use error::ProxyError;
pub use wire::{decode_response, encode_response};

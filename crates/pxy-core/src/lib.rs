//! pxy core
//!
//! This crate provides the caching reverse proxy's core: the size-bounded
//! LRU cache store with its eviction worker, the resource trie resolving
//! request paths to upstream targets, and the cache-aside transport tying
//! them together.

pub mod cache;
pub mod config;
pub mod error;
pub mod resource;
pub mod transport;

pub use cache::{CacheConfig, CacheItem, CacheLookup, CacheStore};
pub use config::{Auth, Resource, TargetConfig};
pub use error::CoreError;
pub use resource::ResourceTrie;
pub use transport::CacheTransport;

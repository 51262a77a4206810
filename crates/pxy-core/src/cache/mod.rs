//! Cache store module

mod item;
mod store;
mod worker;

pub use item::CacheItem;
pub use store::{CacheConfig, CacheLookup, CacheStore};

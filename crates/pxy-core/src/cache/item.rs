//! Cached item

use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Current time as a unix timestamp in seconds
pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

/// A serialized response stored under a request path
#[derive(Debug)]
pub struct CacheItem {
    /// Unique per item, so a replaced item and its successor never collide
    id: u64,
    key: String,
    data: RwLock<Option<Bytes>>,
    /// Absolute unix timestamp (seconds)
    expiration: i64,
    /// Set once the item has left the key map
    deleted: AtomicBool,
}

impl CacheItem {
    pub(crate) fn new(key: String, data: Bytes, expiration: i64) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            key,
            data: RwLock::new(Some(data)),
            expiration,
            deleted: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored payload, or `None` once it has been cleared on expiry
    pub fn data(&self) -> Option<Bytes> {
        self.data.read().clone()
    }

    /// Payload length in bytes (zero once cleared)
    pub fn len(&self) -> u64 {
        self.data.read().as_ref().map_or(0, |d| d.len() as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn expiration(&self) -> i64 {
        self.expiration
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expiration
    }

    /// Whether the item has been removed from the key map
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    pub(crate) fn clear_data(&self) {
        *self.data.write() = None;
    }

}

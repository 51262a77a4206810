//! Size-bounded cache store
//!
//! The key map is guarded by a read-write lock and is updated synchronously.
//! Recency ordering and size accounting are applied asynchronously by a
//! single eviction worker fed through a bounded queue, so the map and the
//! running size may briefly disagree until the queue drains.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::item::{CacheItem, now};
use super::worker::{EvictionWorker, Operation};

const MEGABYTE: u64 = 1024 * 1024;

/// Configuration for the cache store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum cache size in bytes
    pub max_size: u64,
    /// Bytes to free below `max_size` once it is exceeded
    pub size_to_prune: u64,
    /// Capacity of the eviction worker's queue
    pub queue_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 128 * MEGABYTE,
            size_to_prune: MEGABYTE,
            queue_capacity: 10,
        }
    }
}

impl CacheConfig {
    /// Build from sizes given in megabytes, treating zero as "use the default"
    pub fn from_megabytes(max_memory: u64, size_to_prune: u64) -> Self {
        let defaults = Self::default();
        Self {
            max_size: if max_memory == 0 {
                defaults.max_size
            } else {
                max_memory * MEGABYTE
            },
            size_to_prune: if size_to_prune == 0 {
                defaults.size_to_prune
            } else {
                size_to_prune * MEGABYTE
            },
            ..defaults
        }
    }

    /// Size the eviction pass prunes down to
    pub fn prune_floor(&self) -> u64 {
        self.max_size.saturating_sub(self.size_to_prune)
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Live entry
    Hit(Arc<CacheItem>),
    /// Entry past its expiration; its payload has been cleared
    Expired(Arc<CacheItem>),
    Missing,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    /// The item, if the key was present at all
    pub fn item(&self) -> Option<&Arc<CacheItem>> {
        match self {
            CacheLookup::Hit(item) | CacheLookup::Expired(item) => Some(item),
            CacheLookup::Missing => None,
        }
    }
}

/// State shared between store handles and the eviction worker
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) items: RwLock<HashMap<String, Arc<CacheItem>>>,
    /// Running size as last published by the worker
    pub(crate) size: AtomicU64,
}

/// Handle to the cache store. Cloning is cheap; the eviction worker stops
/// once every handle has been dropped.
#[derive(Clone)]
pub struct CacheStore {
    shared: Arc<Shared>,
    operations: mpsc::Sender<Operation>,
}

impl CacheStore {
    /// Create a new cache store and spawn its eviction worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: CacheConfig) -> Self {
        info!(
            "Initializing cache store (max_size: {} bytes, prune to: {} bytes)",
            config.max_size,
            config.prune_floor()
        );

        let shared = Arc::new(Shared::default());
        let (operations, queue) = mpsc::channel(config.queue_capacity.max(1));

        let worker = EvictionWorker::new(shared.clone(), config.max_size, config.prune_floor());
        tokio::spawn(worker.run(queue));

        Self { shared, operations }
    }

    /// Look up a key.
    ///
    /// An expired entry has its payload cleared in place but stays in the
    /// map and in the recency list. A live entry is promoted.
    pub async fn get(&self, key: &str) -> CacheLookup {
        let item = self.shared.items.read().get(key).cloned();

        let Some(item) = item else {
            return CacheLookup::Missing;
        };

        if item.is_expired_at(now()) {
            item.clear_data();
            return CacheLookup::Expired(item);
        }

        self.enqueue(Operation::Promote(item.clone())).await;
        CacheLookup::Hit(item)
    }

    /// Store a payload under a key, replacing any previous entry
    pub async fn set(&self, key: impl Into<String>, data: Bytes, expiration: i64) -> Arc<CacheItem> {
        let key = key.into();
        let item = Arc::new(CacheItem::new(key.clone(), data, expiration));

        let existing = self.shared.items.write().insert(key, item.clone());

        if let Some(existing) = existing {
            existing.mark_deleted();
            self.enqueue(Operation::Delete(existing)).await;
        }
        self.enqueue(Operation::Promote(item.clone())).await;

        item
    }

    /// Remove a key, returning the removed item
    pub async fn delete(&self, key: &str) -> Option<Arc<CacheItem>> {
        let item = self.shared.items.write().remove(key)?;

        item.mark_deleted();
        self.enqueue(Operation::Delete(item.clone())).await;

        Some(item)
    }

    /// Wait until every operation queued before this call has been applied
    pub async fn sync(&self) {
        let (reply, done) = oneshot::channel();
        self.enqueue(Operation::Sync(reply)).await;
        // A dropped reply means the worker is gone; nothing left to wait for
        let _ = done.await;
    }

    /// Bytes currently accounted to linked items
    pub fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Acquire)
    }

    /// Number of keys in the map
    pub fn len(&self) -> usize {
        self.shared.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn enqueue(&self, operation: Operation) {
        if self.operations.send(operation).await.is_err() {
            warn!("Eviction worker has stopped, dropping cache operation");
        }
    }
}

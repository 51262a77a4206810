//! Eviction worker
//!
//! The single consumer of the cache's operation queue. It owns the recency
//! list outright, so promote, delete and garbage collection are serialized
//! by construction and the list itself needs no lock.

use lru::LruCache;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::item::CacheItem;
use super::store::Shared;

/// A request for the eviction worker
#[derive(Debug)]
pub(crate) enum Operation {
    Promote(Arc<CacheItem>),
    Delete(Arc<CacheItem>),
    /// Answered once every earlier operation has been applied
    Sync(oneshot::Sender<()>),
}

/// An item in the recency list with the bytes charged when it was linked
struct Linked {
    item: Arc<CacheItem>,
    charged: u64,
}

pub(crate) struct EvictionWorker {
    shared: Arc<Shared>,
    /// Keyed by item id; unbounded because eviction is by bytes, not count
    lru: LruCache<u64, Linked>,
    size: u64,
    max_size: u64,
    prune_floor: u64,
}

impl EvictionWorker {
    pub(crate) fn new(shared: Arc<Shared>, max_size: u64, prune_floor: u64) -> Self {
        Self {
            shared,
            lru: LruCache::unbounded(),
            size: 0,
            max_size,
            prune_floor,
        }
    }

    /// Drain the queue until every sender is gone
    pub(crate) async fn run(mut self, mut queue: mpsc::Receiver<Operation>) {
        debug!("Eviction worker started");

        while let Some(operation) = queue.recv().await {
            self.apply(operation);
        }

        debug!("Eviction worker stopped ({} items linked)", self.lru.len());
    }

    fn apply(&mut self, operation: Operation) {
        match operation {
            Operation::Promote(item) => {
                self.promote(item);
                if self.size > self.max_size {
                    self.gc();
                }
            }
            Operation::Delete(item) => self.unlink(&item),
            Operation::Sync(reply) => {
                let _ = reply.send(());
            }
        }
        self.publish_size();
    }

    /// Move an item to the most recently used end, linking it if needed
    fn promote(&mut self, item: Arc<CacheItem>) {
        let id = item.id();
        if self.lru.contains(&id) {
            self.lru.promote(&id);
            return;
        }

        // Already gone from the map; linking it now would leak it
        if item.is_deleted() {
            return;
        }

        let charged = item.len();
        self.lru.push(id, Linked { item, charged });
        self.size += charged;
    }

    fn unlink(&mut self, item: &CacheItem) {
        if let Some(linked) = self.lru.pop(&item.id()) {
            self.size = self.size.saturating_sub(linked.charged);
        }
    }

    /// Evict least recently used items until the size is at the prune floor
    fn gc(&mut self) {
        let before = self.size;
        let mut evicted = 0u64;

        while self.size > self.prune_floor {
            let Some((_, Linked { item, charged })) = self.lru.pop_lru() else {
                break;
            };
            self.size = self.size.saturating_sub(charged);

            {
                let mut items = self.shared.items.write();
                if items
                    .get(item.key())
                    .is_some_and(|current| Arc::ptr_eq(current, &item))
                {
                    items.remove(item.key());
                }
            }
            item.mark_deleted();

            debug!("Evicted cache entry: {}", item.key());
            evicted += 1;
        }

        metrics::counter!("pxy_cache_evictions_total").increment(evicted);
        info!(
            "Cache size {} exceeded limit {}, evicted {} entries ({} bytes freed)",
            before,
            self.max_size,
            evicted,
            before - self.size
        );
    }

    fn publish_size(&self) {
        self.shared.size.store(self.size, Ordering::Release);
        metrics::gauge!("pxy_cache_size_bytes").set(self.size as f64);
    }

    #[cfg(test)]
    fn is_linked(&self, item: &CacheItem) -> bool {
        self.lru.contains(&item.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn worker(max_size: u64, prune_floor: u64) -> EvictionWorker {
        EvictionWorker::new(Arc::new(Shared::default()), max_size, prune_floor)
    }

    fn insert(worker: &EvictionWorker, key: &str, data: &'static [u8]) -> Arc<CacheItem> {
        let item = Arc::new(CacheItem::new(key.to_string(), Bytes::from_static(data), i64::MAX));
        worker
            .shared
            .items
            .write()
            .insert(key.to_string(), item.clone());
        item
    }

    #[test]
    fn test_promote_into_empty_store_adds_exact_size() {
        let mut worker = worker(1024, 1014);
        let item = insert(&worker, "key", b"abcdefeg");

        worker.apply(Operation::Promote(item.clone()));

        assert_eq!(worker.size, 8);
        assert!(worker.is_linked(&item));
        assert_eq!(worker.shared.size.load(Ordering::Acquire), 8);
    }

    #[test]
    fn test_delete_of_unlinked_item_is_noop() {
        let mut worker = worker(1024, 1014);
        let item = insert(&worker, "key", b"abcdefeg");

        worker.apply(Operation::Delete(item.clone()));
        worker.apply(Operation::Delete(item));

        assert_eq!(worker.size, 0);
        assert!(worker.lru.is_empty());
    }

    #[test]
    fn test_tombstoned_item_is_never_linked() {
        let mut worker = worker(1024, 1014);
        let item = insert(&worker, "key", b"abcdefeg");
        item.mark_deleted();

        worker.apply(Operation::Promote(item.clone()));

        assert_eq!(worker.size, 0);
        assert!(!worker.is_linked(&item));
    }

    #[test]
    fn test_cleared_item_releases_its_original_charge() {
        let mut worker = worker(1024, 1014);
        let item = insert(&worker, "key", b"abcdefeg");

        worker.apply(Operation::Promote(item.clone()));
        item.clear_data();
        worker.apply(Operation::Delete(item));

        assert_eq!(worker.size, 0);
    }

    #[test]
    fn test_gc_evicts_least_recently_promoted_first() {
        let mut worker = worker(12, 8);
        let a = insert(&worker, "a", b"xxxx");
        let b = insert(&worker, "b", b"xxxx");
        let c = insert(&worker, "c", b"xxxx");

        worker.apply(Operation::Promote(a.clone()));
        worker.apply(Operation::Promote(b.clone()));
        worker.apply(Operation::Promote(c.clone()));
        // Touching a again leaves b as the least recently used
        worker.apply(Operation::Promote(a.clone()));
        assert_eq!(worker.size, 12);

        let d = insert(&worker, "d", b"xxxx");
        worker.apply(Operation::Promote(d.clone()));

        // 16 > 12 prunes b then c, down to 8
        assert_eq!(worker.size, 8);
        assert!(b.is_deleted() && c.is_deleted());
        assert!(worker.is_linked(&a) && worker.is_linked(&d));
        let items = worker.shared.items.read();
        assert!(!items.contains_key("b") && !items.contains_key("c"));
        assert!(items.contains_key("a") && items.contains_key("d"));
    }

    #[test]
    fn test_gc_keeps_replacement_in_map() {
        let mut worker = worker(10, 5);
        let old = insert(&worker, "key", b"12345678");
        worker.apply(Operation::Promote(old.clone()));

        // Replaced in the map before the worker sees the delete
        let new = insert(&worker, "key", b"abc");
        old.mark_deleted();
        worker.apply(Operation::Promote(new.clone()));

        // 11 > 10 prunes the old item only; the map keeps the newer one
        assert_eq!(worker.size, 3);
        assert!(!worker.is_linked(&old));
        assert!(worker.is_linked(&new));
        let items = worker.shared.items.read();
        assert!(Arc::ptr_eq(items.get("key").unwrap(), &new));
    }
}

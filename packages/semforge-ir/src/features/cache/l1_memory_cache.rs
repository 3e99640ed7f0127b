//! L1 memory cache: strict LRU bounded by entry count and estimated bytes.
//!
//! Insertion evicts from the LRU tail until both bounds hold again, so the
//! invariants `sum(estimated_size) <= max_bytes` and `len <= max_entries`
//! are true at every point a caller can observe.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::metrics::TieredCacheMetrics;
use super::types::Hash128;

/// Trait for estimating the resident size of cached values.
pub trait EstimateSize {
    fn estimated_size_bytes(&self) -> usize;
}

struct Inner<V> {
    lru: LruCache<Hash128, Arc<V>>,
    bytes: u64,
}

/// L1 memory cache.
pub struct MemoryCache<V: EstimateSize> {
    inner: Mutex<Inner<V>>,
    max_entries: usize,
    max_bytes: u64,
    metrics: Arc<TieredCacheMetrics>,
}

impl<V: EstimateSize> MemoryCache<V> {
    pub fn new(max_entries: usize, max_bytes: u64, metrics: Arc<TieredCacheMetrics>) -> Self {
        Self {
            // Capacity is enforced manually (dual bound); the LRU itself
            // only tracks recency order.
            inner: Mutex::new(Inner {
                lru: LruCache::unbounded(),
                bytes: 0,
            }),
            max_entries: max_entries.max(1),
            max_bytes,
            metrics,
        }
    }

    pub fn get(&self, key: &Hash128) -> Option<Arc<V>> {
        let mut inner = self.inner.lock();
        let hit = inner.lru.get(key).cloned();
        if hit.is_some() {
            self.metrics.l1_hits.inc();
        }
        hit
    }

    /// Peek without promoting LRU order (used by stats and tests).
    pub fn peek(&self, key: &Hash128) -> Option<Arc<V>> {
        self.inner.lock().lru.peek(key).cloned()
    }

    pub fn insert(&self, key: Hash128, value: Arc<V>) {
        let size = value.estimated_size_bytes() as u64;
        if size > self.max_bytes {
            // A value that can never fit would evict the whole tier for
            // nothing; serve it from L2 instead.
            tracing::debug!(size, max = self.max_bytes, "L1 skipping oversized value");
            return;
        }

        let mut inner = self.inner.lock();
        if let Some(old) = inner.lru.put(key, value) {
            inner.bytes = inner.bytes.saturating_sub(old.estimated_size_bytes() as u64);
        }
        inner.bytes += size;

        while inner.lru.len() > self.max_entries || inner.bytes > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((_, evicted)) => {
                    inner.bytes = inner
                        .bytes
                        .saturating_sub(evicted.estimated_size_bytes() as u64);
                    self.metrics.evictions.inc();
                }
                None => break,
            }
        }

        self.metrics.entries.set(inner.lru.len() as i64);
        self.metrics.bytes.set(inner.bytes as i64);
    }

    pub fn invalidate(&self, key: &Hash128) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.lru.pop(key) {
            inner.bytes = inner.bytes.saturating_sub(old.estimated_size_bytes() as u64);
        }
        self.metrics.entries.set(inner.lru.len() as i64);
        self.metrics.bytes.set(inner.bytes as i64);
    }

    /// Remove entries matching a predicate.
    pub fn invalidate_matching(&self, mut pred: impl FnMut(&Hash128) -> bool) {
        let mut inner = self.inner.lock();
        let victims: Vec<Hash128> = inner
            .lru
            .iter()
            .filter(|(k, _)| pred(k))
            .map(|(k, _)| *k)
            .collect();
        for key in victims {
            if let Some(old) = inner.lru.pop(&key) {
                inner.bytes = inner.bytes.saturating_sub(old.estimated_size_bytes() as u64);
            }
        }
        self.metrics.entries.set(inner.lru.len() as i64);
        self.metrics.bytes.set(inner.bytes as i64);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> u64 {
        self.inner.lock().bytes
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.bytes = 0;
        self.metrics.entries.set(0);
        self.metrics.bytes.set(0);
    }

    /// Entry-count capacity as a `NonZeroUsize` (config plumbing helper).
    pub fn capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).expect("max_entries >= 1")
    }
}

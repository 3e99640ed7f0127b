//! L0 session cache: per-builder state with a stat-only fast path.
//!
//! Maps `FileId` → (value handle, cache key, file metadata). Bounded by
//! entry count; eviction is deterministic: the entry with the oldest
//! logical access tick goes first, ties broken by lexicographic `FileId`.
//! Orphans (files absent from the latest request set) are purged at the
//! start of every request.
//!
//! The stored cache key guards keyed lookups: a config change produces a
//! different key, so a stale entry can never be served as a hit. The
//! stat-only fast path is reserved for values keyed purely by content
//! (structural IR).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::metrics::TieredCacheMetrics;
use super::types::{FileId, FileMetadata, Hash128};

struct SessionEntry<V> {
    value: Arc<V>,
    key: Hash128,
    metadata: FileMetadata,
    /// Logical access tick (not wall clock, so eviction order is
    /// reproducible across runs).
    access_tick: AtomicU64,
}

/// L0 builder-state cache.
pub struct SessionCache<V> {
    store: DashMap<FileId, SessionEntry<V>>,
    clock: AtomicU64,
    max_entries: usize,
    metrics: Arc<TieredCacheMetrics>,
}

impl<V> SessionCache<V> {
    pub fn new(max_entries: usize, metrics: Arc<TieredCacheMetrics>) -> Self {
        Self {
            store: DashMap::new(),
            clock: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            metrics,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fast path: hit on matching mtime + size without rehashing content.
    pub fn check_fast_path(&self, file_id: &FileId, mtime_ns: u64, size_bytes: u64) -> Option<Arc<V>> {
        let entry = self.store.get(file_id)?;
        if entry.metadata.matches_fast(mtime_ns, size_bytes) {
            entry.access_tick.store(self.tick(), Ordering::Relaxed);
            self.metrics.l0_fast_path_hits.inc();
            self.metrics.l0_hits.inc();
            return Some(Arc::clone(&entry.value));
        }
        None
    }

    /// Keyed check: hit only when the stored cache key matches.
    pub fn get(&self, file_id: &FileId, key: &Hash128) -> Option<Arc<V>> {
        let entry = self.store.get(file_id)?;
        if entry.key == *key {
            entry.access_tick.store(self.tick(), Ordering::Relaxed);
            self.metrics.l0_hits.inc();
            return Some(Arc::clone(&entry.value));
        }
        None
    }

    /// Refresh mtime/size after a content-confirmed hit, so the next
    /// request takes the fast path again.
    pub fn promote_metadata(&self, file_id: &FileId, mtime_ns: u64, size_bytes: u64) {
        if let Some(mut entry) = self.store.get_mut(file_id) {
            entry.metadata.mtime_ns = mtime_ns;
            entry.metadata.size_bytes = size_bytes;
        }
    }

    pub fn insert(&self, file_id: FileId, key: Hash128, value: Arc<V>, metadata: FileMetadata) {
        let entry = SessionEntry {
            value,
            key,
            metadata,
            access_tick: AtomicU64::new(self.tick()),
        };
        self.store.insert(file_id, entry);
        self.evict_over_capacity();
    }

    /// Evict until within bound. Victim: smallest `(access_tick, file_id)`.
    fn evict_over_capacity(&self) {
        while self.store.len() > self.max_entries {
            let victim = self
                .store
                .iter()
                .map(|entry| (entry.value().access_tick.load(Ordering::Relaxed), entry.key().clone()))
                .min();
            match victim {
                Some((_, file_id)) => {
                    self.store.remove(&file_id);
                    self.metrics.evictions.inc();
                }
                None => break,
            }
        }
    }

    pub fn invalidate(&self, file_id: &FileId) {
        self.store.remove(file_id);
    }

    /// Drop entries for files absent from the current request set.
    pub fn purge_orphans(&self, current_files: &HashSet<FileId>) {
        let mut purged = 0u64;
        self.store.retain(|file_id, _| {
            if current_files.contains(file_id) {
                true
            } else {
                purged += 1;
                false
            }
        });
        if purged > 0 {
            tracing::debug!(purged, "L0 purged orphan entries");
            self.metrics.purged.inc_by(purged);
        }
    }

    pub fn metadata(&self, file_id: &FileId) -> Option<FileMetadata> {
        self.store.get(file_id).map(|e| e.metadata)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cache::types::ContentHash;
    use prometheus::Registry;

    fn metrics() -> Arc<TieredCacheMetrics> {
        Arc::new(TieredCacheMetrics::new("l0test", &Registry::new()))
    }

    fn meta(mtime: u64, size: u64, content: &[u8]) -> FileMetadata {
        FileMetadata::new(mtime, size, ContentHash::compute(content))
    }

    fn key(content: &[u8]) -> Hash128 {
        Hash128::compute(content)
    }

    #[test]
    fn test_fast_path_hit_and_miss() {
        let cache = SessionCache::new(10, metrics());
        let id = FileId::new("a.py");
        cache.insert(id.clone(), key(b"code"), Arc::new("ir".to_string()), meta(100, 5, b"code"));

        assert!(cache.check_fast_path(&id, 100, 5).is_some());
        assert!(cache.check_fast_path(&id, 101, 5).is_none());
        assert!(cache.check_fast_path(&id, 100, 6).is_none());
    }

    #[test]
    fn test_keyed_hit_after_touch() {
        let cache = SessionCache::new(10, metrics());
        let id = FileId::new("a.py");
        cache.insert(id.clone(), key(b"code"), Arc::new(1u32), meta(100, 5, b"code"));

        // mtime changed but content identical: keyed check hits, metadata
        // promotion restores the fast path.
        assert!(cache.check_fast_path(&id, 200, 5).is_none());
        assert!(cache.get(&id, &key(b"code")).is_some());
        cache.promote_metadata(&id, 200, 5);
        assert!(cache.check_fast_path(&id, 200, 5).is_some());
    }

    #[test]
    fn test_key_mismatch_misses() {
        let cache = SessionCache::new(10, metrics());
        let id = FileId::new("a.py");
        cache.insert(id.clone(), key(b"base-tier"), Arc::new(1u32), meta(1, 1, b"code"));
        // Same file, different key (e.g. config change): no hit.
        assert!(cache.get(&id, &key(b"full-tier")).is_none());
    }

    #[test]
    fn test_bounded_deterministic_eviction() {
        let cache = SessionCache::new(2, metrics());
        cache.insert(FileId::new("a.py"), key(b"a"), Arc::new(1u32), meta(1, 1, b"a"));
        cache.insert(FileId::new("b.py"), key(b"b"), Arc::new(2u32), meta(2, 2, b"b"));
        // Touch a.py so b.py becomes the oldest access.
        assert!(cache.get(&FileId::new("a.py"), &key(b"a")).is_some());

        cache.insert(FileId::new("c.py"), key(b"c"), Arc::new(3u32), meta(3, 3, b"c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.metadata(&FileId::new("b.py")).is_none());
        assert!(cache.metadata(&FileId::new("a.py")).is_some());
        assert!(cache.metadata(&FileId::new("c.py")).is_some());
    }

    #[test]
    fn test_purge_orphans() {
        let cache = SessionCache::new(10, metrics());
        for name in ["a.py", "b.py", "c.py"] {
            cache.insert(FileId::new(name), key(name.as_bytes()), Arc::new(0u32), meta(1, 1, name.as_bytes()));
        }
        let current: HashSet<FileId> = [FileId::new("a.py"), FileId::new("b.py")].into_iter().collect();
        cache.purge_orphans(&current);
        assert_eq!(cache.len(), 2);
        assert!(cache.metadata(&FileId::new("c.py")).is_none());
    }

    #[test]
    fn test_bound_holds_always() {
        let cache = SessionCache::new(5, metrics());
        for i in 0..50 {
            let name = format!("f{i:03}.py");
            cache.insert(
                FileId::new(&name),
                key(name.as_bytes()),
                Arc::new(i),
                meta(i as u64, 1, name.as_bytes()),
            );
            assert!(cache.len() <= 5);
        }
    }
}

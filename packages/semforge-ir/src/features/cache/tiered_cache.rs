//! Tiered cache facade: L0 → L1 → L2 with promotion.
//!
//! Read: L0 → L1 → L2 → miss; an L1 hit backfills L0, an L2 hit backfills
//! both. Write: write-through to every enabled tier. When the three-tier
//! flag is off only L0 (builder state) is kept.
//!
//! Cache-layer errors never escape this facade: every failure on the read
//! path degrades to a miss, every failure on the write path is counted and
//! swallowed.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use prometheus::Registry;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::l0_session_cache::SessionCache;
use super::l1_memory_cache::{EstimateSize, MemoryCache};
use super::l2_disk_cache::{CacheNamespace, DiskCache};
use super::metrics::{CacheStats, TieredCacheMetrics};
use super::types::{FileId, FileMetadata, Hash128};

/// Sizing and placement knobs for one namespace.
#[derive(Debug, Clone)]
pub struct TierSettings {
    pub l0_max_files: usize,
    pub l1_max_entries: usize,
    pub l1_max_bytes: u64,
    pub engine_version: String,
    pub schema_version: u16,
    /// Enables L1/L2; L0 is always on (builder state).
    pub enable_three_tier: bool,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            l0_max_files: 2000,
            l1_max_entries: 4096,
            l1_max_bytes: 512 * 1024 * 1024,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: 1,
            enable_three_tier: true,
        }
    }
}

/// Three-tier cache for one namespace.
pub struct TieredCache<V>
where
    V: EstimateSize + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    l0: SessionCache<V>,
    l1: MemoryCache<V>,
    l2: DiskCache,
    enable_three_tier: bool,
    metrics: Arc<TieredCacheMetrics>,
}

impl<V> TieredCache<V>
where
    V: EstimateSize + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        cache_root: &Path,
        namespace: CacheNamespace,
        settings: &TierSettings,
        registry: &Registry,
    ) -> std::io::Result<Self> {
        let metrics = Arc::new(TieredCacheMetrics::new(namespace.domain, registry));
        let l0 = SessionCache::new(settings.l0_max_files, Arc::clone(&metrics));
        let l1 = MemoryCache::new(
            settings.l1_max_entries,
            settings.l1_max_bytes,
            Arc::clone(&metrics),
        );
        let l2 = DiskCache::new(
            cache_root,
            namespace,
            &settings.engine_version,
            settings.schema_version,
            Arc::clone(&metrics),
        )?;
        Ok(Self {
            l0,
            l1,
            l2,
            enable_three_tier: settings.enable_three_tier,
            metrics,
        })
    }

    /// Stat-only fast path (content-keyed namespaces only).
    pub fn fast_path(&self, file_id: &FileId, mtime_ns: u64, size_bytes: u64) -> Option<Arc<V>> {
        self.l0.check_fast_path(file_id, mtime_ns, size_bytes)
    }

    /// Tiered lookup with promotion.
    pub fn get(&self, file_id: &FileId, key: Hash128, metadata: &FileMetadata) -> Option<Arc<V>> {
        if let Some(value) = self.l0.get(file_id, &key) {
            self.l0
                .promote_metadata(file_id, metadata.mtime_ns, metadata.size_bytes);
            return Some(value);
        }

        if self.enable_three_tier {
            if let Some(value) = self.l1.get(&key) {
                self.l0
                    .insert(file_id.clone(), key, Arc::clone(&value), *metadata);
                return Some(value);
            }

            if let Some(decoded) = self.l2.get::<V>(&key) {
                let value = Arc::new(decoded);
                self.l1.insert(key, Arc::clone(&value));
                self.l0
                    .insert(file_id.clone(), key, Arc::clone(&value), *metadata);
                self.metrics.l2_hits.inc();
                return Some(value);
            }
        }

        self.metrics.misses.inc();
        None
    }

    /// Keyed lookup without touching L0 (no file identity available, e.g.
    /// cross-snapshot graph documents).
    pub fn get_keyed(&self, key: Hash128) -> Option<Arc<V>> {
        if self.enable_three_tier {
            if let Some(value) = self.l1.get(&key) {
                return Some(value);
            }
            if let Some(decoded) = self.l2.get::<V>(&key) {
                let value = Arc::new(decoded);
                self.l1.insert(key, Arc::clone(&value));
                self.metrics.l2_hits.inc();
                return Some(value);
            }
        }
        self.metrics.misses.inc();
        None
    }

    /// Write-through to every enabled tier.
    pub fn set(&self, file_id: &FileId, key: Hash128, value: Arc<V>, metadata: &FileMetadata) {
        self.l0
            .insert(file_id.clone(), key, Arc::clone(&value), *metadata);
        if self.enable_three_tier {
            self.l1.insert(key, Arc::clone(&value));
            self.l2.set(&key, &*value);
        }
    }

    /// Keyed write without an owning file.
    pub fn set_keyed(&self, key: Hash128, value: Arc<V>) {
        if self.enable_three_tier {
            self.l1.insert(key, Arc::clone(&value));
            self.l2.set(&key, &*value);
        }
    }

    pub fn invalidate(&self, file_id: &FileId, key: &Hash128) {
        self.l0.invalidate(file_id);
        self.l1.invalidate(key);
        self.l2.invalidate(key);
    }

    /// Remove L1/L2 entries matching a key predicate.
    pub fn invalidate_matching(&self, mut pred: impl FnMut(&Hash128) -> bool) {
        self.l1.invalidate_matching(&mut pred);
        self.l2.invalidate_matching(pred);
    }

    /// Drop L0 entries for files outside the current request set. Called at
    /// the start of every build request.
    pub fn purge_orphans(&self, current_files: &HashSet<FileId>) {
        self.l0.purge_orphans(current_files);
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    pub fn hit_rate(&self) -> f64 {
        self.metrics.overall_hit_rate()
    }

    pub fn l0_len(&self) -> usize {
        self.l0.len()
    }

    pub fn l1_len(&self) -> usize {
        self.l1.len()
    }

    pub fn l1_bytes(&self) -> u64 {
        self.l1.bytes()
    }

    pub fn l2_len(&self) -> usize {
        self.l2.len()
    }

    /// Lifecycle: drop in-memory tiers, keep disk. Used at builder
    /// shutdown; L2 writes are synchronous so there is nothing to drain.
    pub fn shutdown(&self) {
        self.l0.clear();
        self.l1.clear();
    }

    /// Drop every tier including disk.
    pub fn clear(&self) -> std::io::Result<()> {
        self.l0.clear();
        self.l1.clear();
        self.l2.clear()
    }
}

//! Prometheus metrics for the cache tiers.
//!
//! Metric names are prefixed with the namespace (`structural`, `semantic`,
//! `graph`) so several tiered caches can share one registry.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};
use serde::{Deserialize, Serialize};

/// Point-in-time counter snapshot exposed through `TieredCache::stats()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub l0_hits: u64,
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub purged: u64,
    pub corrupt_entries: u64,
    pub schema_mismatches: u64,
    pub transient_retries: u64,
    pub write_fails: u64,
    pub disk_full_errors: u64,
    pub bytes: u64,
    pub entries: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.l0_hits + self.l1_hits + self.l2_hits
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total > 0 {
            self.hits() as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Live counters for one tiered cache namespace.
#[derive(Clone)]
pub struct TieredCacheMetrics {
    pub l0_hits: IntCounter,
    pub l0_fast_path_hits: IntCounter,
    pub l1_hits: IntCounter,
    pub l2_hits: IntCounter,
    pub misses: IntCounter,
    pub evictions: IntCounter,
    pub purged: IntCounter,
    pub corrupt_entries: IntCounter,
    pub schema_mismatches: IntCounter,
    pub transient_retries: IntCounter,
    pub write_fails: IntCounter,
    pub disk_full_errors: IntCounter,
    pub bytes: IntGauge,
    pub entries: IntGauge,
}

impl TieredCacheMetrics {
    pub fn new(namespace: &str, registry: &Registry) -> Self {
        let counter = |name: &str, help: &str| {
            register_int_counter_with_registry!(
                Opts::new(format!("cache_{namespace}_{name}"), help.to_string()),
                registry
            )
            .expect("metric registration")
        };
        let gauge = |name: &str, help: &str| {
            register_int_gauge_with_registry!(
                Opts::new(format!("cache_{namespace}_{name}"), help.to_string()),
                registry
            )
            .expect("metric registration")
        };

        Self {
            l0_hits: counter("l0_hits_total", "L0 cache hits"),
            l0_fast_path_hits: counter("l0_fast_path_hits_total", "L0 fast path hits (mtime+size)"),
            l1_hits: counter("l1_hits_total", "L1 cache hits"),
            l2_hits: counter("l2_hits_total", "L2 cache hits"),
            misses: counter("misses_total", "Cache misses across all tiers"),
            evictions: counter("evictions_total", "L0/L1 evictions"),
            purged: counter("purged_total", "L0 purged orphan entries"),
            corrupt_entries: counter("l2_corrupt_total", "L2 corrupt records deleted"),
            schema_mismatches: counter("l2_schema_mismatch_total", "L2 schema mismatches deleted"),
            transient_retries: counter("l2_transient_retries_total", "L2 transient read retries"),
            write_fails: counter("l2_write_fails_total", "L2 write failures"),
            disk_full_errors: counter("l2_disk_full_total", "L2 disk-full write failures"),
            bytes: gauge("l1_bytes", "L1 estimated bytes"),
            entries: gauge("l1_entries", "L1 entry count"),
        }
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            l0_hits: self.l0_hits.get(),
            l1_hits: self.l1_hits.get(),
            l2_hits: self.l2_hits.get(),
            misses: self.misses.get(),
            evictions: self.evictions.get(),
            purged: self.purged.get(),
            corrupt_entries: self.corrupt_entries.get(),
            schema_mismatches: self.schema_mismatches.get(),
            transient_retries: self.transient_retries.get(),
            write_fails: self.write_fails.get(),
            disk_full_errors: self.disk_full_errors.get(),
            bytes: self.bytes.get().max(0) as u64,
            entries: self.entries.get().max(0) as u64,
        }
    }

    pub fn overall_hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }
}

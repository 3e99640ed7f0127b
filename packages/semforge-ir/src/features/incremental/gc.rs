//! Snapshot garbage collection.
//!
//! A background thread periodically applies the retention policy against
//! the snapshot store. Eligible snapshots are removed with their owned
//! cache entries in one store transaction; the evicted keys come back to
//! the caller so L2 entries can be dropped too.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{bounded, Sender};

use crate::config::GcPolicy;
use crate::features::cache::Hash128;
use crate::features::storage::{SnapshotRecord, SnapshotStore};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcReport {
    pub examined: usize,
    pub deleted: Vec<u64>,
    pub evicted_keys: Vec<Hash128>,
}

pub struct GarbageCollector {
    store: Arc<dyn SnapshotStore>,
    policy: GcPolicy,
}

impl GarbageCollector {
    pub fn new(store: Arc<dyn SnapshotStore>, policy: GcPolicy) -> Self {
        Self { store, policy }
    }

    /// One collection pass for a repository.
    pub fn collect(&self, repo_id: &str) -> GcReport {
        let rows = match self.store.list(repo_id) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(%err, repo_id, "GC list failed, skipping pass");
                return GcReport::default();
            }
        };
        let examined = rows.len();

        let victims: Vec<u64> = rows
            .iter()
            .enumerate()
            .filter(|(rank, row)| !self.retained(*rank, row))
            .map(|(_, row)| row.snapshot_id)
            .collect();

        if victims.is_empty() {
            return GcReport {
                examined,
                ..GcReport::default()
            };
        }

        match self.store.delete_cascade(repo_id, &victims) {
            Ok(evicted_keys) => {
                tracing::info!(
                    repo_id,
                    deleted = victims.len(),
                    evicted = evicted_keys.len(),
                    "GC pass complete"
                );
                GcReport {
                    examined,
                    deleted: victims,
                    evicted_keys,
                }
            }
            Err(err) => {
                tracing::warn!(%err, repo_id, "GC cascade delete failed");
                GcReport {
                    examined,
                    ..GcReport::default()
                }
            }
        }
    }

    /// Retention test. `rank` is the row's position in the
    /// newest-first listing.
    fn retained(&self, rank: usize, row: &SnapshotRecord) -> bool {
        if self.policy.keep_tagged && row.tagged {
            return true;
        }
        if rank < self.policy.keep_latest_count {
            return true;
        }
        let age = Utc::now().signed_duration_since(row.indexed_at);
        age.num_days() < self.policy.keep_days as i64
    }

    /// Run in the background at an interval. Dropping the handle (or
    /// calling `shutdown`) stops the thread at the next tick.
    pub fn spawn(self, repo_id: String, interval: Duration) -> GcHandle {
        let (tx, rx) = bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name("semforge-gc".to_string())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        self.collect(&repo_id);
                    }
                }
            })
            .expect("spawn GC thread");
        GcHandle {
            stop: Some(tx),
            thread: Some(handle),
        }
    }
}

pub struct GcHandle {
    stop: Option<Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl GcHandle {
    pub fn shutdown(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::features::cache::ConfigHash;
    use crate::features::storage::{MemoryStore, SnapshotStatus};
    use crate::pipeline::BuildProvenance;
    use chrono::Duration as ChronoDuration;

    fn record(id: u64, age_days: i64, tagged: bool) -> SnapshotRecord {
        let config = BuildConfig::default();
        SnapshotRecord {
            repo_id: "r".into(),
            snapshot_id: id,
            git_commit: None,
            indexed_at: Utc::now() - ChronoDuration::days(age_days),
            status: SnapshotStatus::Committed,
            duration_ms: 1,
            tagged,
            provenance: BuildProvenance {
                input_fingerprint: Hash128::compute(&[id as u8]),
                builder_version: BuildProvenance::builder_version(&config),
                config_fingerprint: ConfigHash::compute(b"c"),
                dependency_fingerprint: Hash128::zero(),
                timestamp: Utc::now(),
                duration: std::time::Duration::from_millis(1),
                parallel_seed: 0,
            },
            owned_keys: vec![Hash128::compute(&[id as u8, 0xFF])],
        }
    }

    fn policy(latest: usize, days: u32) -> GcPolicy {
        GcPolicy {
            keep_latest_count: latest,
            keep_days: days,
            keep_tagged: true,
        }
    }

    #[test]
    fn test_keeps_latest_n() {
        let store = Arc::new(MemoryStore::new());
        for id in 1..=5 {
            store.insert(record(id, 100, false)).unwrap();
        }
        let gc = GarbageCollector::new(store.clone(), policy(2, 0));
        let report = gc.collect("r");

        assert_eq!(report.examined, 5);
        assert_eq!(report.deleted, vec![3, 2, 1]);
        assert_eq!(report.evicted_keys.len(), 3);
        assert_eq!(store.list("r").unwrap().len(), 2);
    }

    #[test]
    fn test_keeps_young_snapshots() {
        let store = Arc::new(MemoryStore::new());
        store.insert(record(1, 100, false)).unwrap();
        store.insert(record(2, 1, false)).unwrap();
        let gc = GarbageCollector::new(store.clone(), policy(0, 30));
        let report = gc.collect("r");

        assert_eq!(report.deleted, vec![1]);
        assert_eq!(store.list("r").unwrap().len(), 1);
    }

    #[test]
    fn test_tagged_snapshots_are_permanent() {
        let store = Arc::new(MemoryStore::new());
        store.insert(record(1, 1000, true)).unwrap();
        store.insert(record(2, 1000, false)).unwrap();
        let gc = GarbageCollector::new(store.clone(), policy(0, 0));
        let report = gc.collect("r");

        assert_eq!(report.deleted, vec![2]);
        let rows = store.list("r").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].tagged);
    }

    #[test]
    fn test_background_handle_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let gc = GarbageCollector::new(store, policy(1, 1));
        let handle = gc.spawn("r".into(), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        handle.shutdown();
    }
}

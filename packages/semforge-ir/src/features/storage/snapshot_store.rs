//! Snapshot metadata store port and the in-memory implementation.
//!
//! The external deployment backs this with a database; the core only
//! needs list/insert/tag and a transactional cascade delete that returns
//! the cache keys the removed snapshots owned.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::cache::Hash128;
use crate::pipeline::BuildProvenance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotStatus {
    Building,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub repo_id: String,
    pub snapshot_id: u64,
    pub git_commit: Option<String>,
    pub indexed_at: DateTime<Utc>,
    pub status: SnapshotStatus,
    pub duration_ms: u64,
    pub tagged: bool,
    pub provenance: BuildProvenance,
    /// L2 keys owned by this snapshot (cascade-deleted with it)
    pub owned_keys: Vec<Hash128>,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("duplicate snapshot {snapshot_id} for {repo_id}")]
    Duplicate { repo_id: String, snapshot_id: u64 },

    #[error("snapshot {snapshot_id} not found for {repo_id}")]
    NotFound { repo_id: String, snapshot_id: u64 },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Snapshot metadata store.
pub trait SnapshotStore: Send + Sync {
    fn insert(&self, record: SnapshotRecord) -> StorageResult<()>;

    /// Records for one repo, newest snapshot first.
    fn list(&self, repo_id: &str) -> StorageResult<Vec<SnapshotRecord>>;

    fn tag(&self, repo_id: &str, snapshot_id: u64) -> StorageResult<()>;

    /// Delete snapshots and everything they own in one transaction.
    /// Returns the owned cache keys of the deleted snapshots.
    fn delete_cascade(&self, repo_id: &str, snapshot_ids: &[u64]) -> StorageResult<Vec<Hash128>>;
}

/// In-memory store for tests and single-process use.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<SnapshotRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn insert(&self, record: SnapshotRecord) -> StorageResult<()> {
        let mut rows = self.rows.lock();
        if rows
            .iter()
            .any(|r| r.repo_id == record.repo_id && r.snapshot_id == record.snapshot_id)
        {
            return Err(StorageError::Duplicate {
                repo_id: record.repo_id,
                snapshot_id: record.snapshot_id,
            });
        }
        rows.push(record);
        Ok(())
    }

    fn list(&self, repo_id: &str) -> StorageResult<Vec<SnapshotRecord>> {
        let rows = self.rows.lock();
        let mut out: Vec<SnapshotRecord> = rows
            .iter()
            .filter(|r| r.repo_id == repo_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.snapshot_id.cmp(&a.snapshot_id));
        Ok(out)
    }

    fn tag(&self, repo_id: &str, snapshot_id: u64) -> StorageResult<()> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|r| r.repo_id == repo_id && r.snapshot_id == snapshot_id)
            .ok_or_else(|| StorageError::NotFound {
                repo_id: repo_id.to_string(),
                snapshot_id,
            })?;
        row.tagged = true;
        Ok(())
    }

    fn delete_cascade(&self, repo_id: &str, snapshot_ids: &[u64]) -> StorageResult<Vec<Hash128>> {
        // Single lock scope = the transaction.
        let mut rows = self.rows.lock();
        let mut evicted = Vec::new();
        rows.retain(|r| {
            if r.repo_id == repo_id && snapshot_ids.contains(&r.snapshot_id) {
                evicted.extend(r.owned_keys.iter().copied());
                false
            } else {
                true
            }
        });
        evicted.sort();
        evicted.dedup();
        Ok(evicted)
    }
}

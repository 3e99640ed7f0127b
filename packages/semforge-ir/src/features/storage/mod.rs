//! Snapshot metadata storage.

mod snapshot_store;

pub use snapshot_store::{
    MemoryStore, SnapshotRecord, SnapshotStatus, SnapshotStore, StorageError, StorageResult,
};

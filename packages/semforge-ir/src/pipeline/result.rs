//! Snapshots: committed, shared-immutable views of a build.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::BuildFault;
use super::provenance::BuildProvenance;
use crate::features::cache::{FileId, FileMetadata, StructuralDigest};
use crate::features::graph::GraphDocument;
use crate::features::semantic::SemanticIR;
use crate::features::structural::StructuralIR;

/// Monotonically assigned snapshot identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SnapshotId(pub u64);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "snap-{}", self.0)
    }
}

/// Per-file entry in a snapshot. IR handles are shared with caches and
/// later snapshots; nothing here is ever mutated after commit.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub metadata: FileMetadata,
    pub structural: Arc<StructuralIR>,
    pub structural_digest: StructuralDigest,
    pub semantic: Option<Arc<SemanticIR>>,
}

/// Stale-edge reconciliation outcome of an incremental transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleReport {
    pub marked: usize,
    pub revalidated_valid: usize,
    pub revalidated_invalid: usize,
}

/// Build execution counters.
#[derive(Debug, Clone, Default)]
pub struct BuildTelemetry {
    pub files_total: usize,
    pub files_reused: usize,
    pub files_rebuilt: usize,
    pub files_failed: usize,
    /// Tasks deferred by admission back-pressure (retried, never lost)
    pub deferred: usize,
    pub duration: Duration,
    pub stage_durations: BTreeMap<&'static str, Duration>,
    pub stale: StaleReport,
}

/// A committed build result.
pub struct Snapshot {
    pub id: SnapshotId,
    pub repo_id: String,
    files: BTreeMap<FileId, FileEntry>,
    graph: Arc<GraphDocument>,
    provenance: BuildProvenance,
    faults: Vec<BuildFault>,
    telemetry: BuildTelemetry,
}

impl Snapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: SnapshotId,
        repo_id: String,
        files: BTreeMap<FileId, FileEntry>,
        graph: Arc<GraphDocument>,
        provenance: BuildProvenance,
        faults: Vec<BuildFault>,
        telemetry: BuildTelemetry,
    ) -> Self {
        Self {
            id,
            repo_id,
            files,
            graph,
            provenance,
            faults,
            telemetry,
        }
    }

    pub fn graph(&self) -> &GraphDocument {
        &self.graph
    }

    pub fn graph_handle(&self) -> Arc<GraphDocument> {
        Arc::clone(&self.graph)
    }

    pub fn provenance(&self) -> &BuildProvenance {
        &self.provenance
    }

    pub fn file(&self, file_id: &FileId) -> Option<&FileEntry> {
        self.files.get(file_id)
    }

    pub fn files(&self) -> &BTreeMap<FileId, FileEntry> {
        &self.files
    }

    /// Metadata view used by change detection on the next build.
    pub fn metadata_map(&self) -> BTreeMap<FileId, FileMetadata> {
        self.files
            .iter()
            .map(|(id, entry)| (id.clone(), entry.metadata))
            .collect()
    }

    pub fn faults(&self) -> &[BuildFault] {
        &self.faults
    }

    /// A snapshot with faults is partial: every non-faulty file is fully
    /// built, faulty files have no semantic IR.
    pub fn is_partial(&self) -> bool {
        !self.faults.is_empty()
    }

    pub fn telemetry(&self) -> &BuildTelemetry {
        &self.telemetry
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.id)
            .field("repo_id", &self.repo_id)
            .field("files", &self.files.len())
            .field("graph_nodes", &self.graph.node_count())
            .field("faults", &self.faults.len())
            .finish()
    }
}

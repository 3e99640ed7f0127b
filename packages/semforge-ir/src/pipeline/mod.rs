//! Pipeline orchestration: coordinator, snapshots, provenance.

mod error;
mod orchestrator;
mod provenance;
mod result;

pub use error::{BuildError, BuildFault, BuildResult, BuildStage};
pub use orchestrator::{Builder, CancellationToken, SHUTDOWN_FLUSH_TIMEOUT};
pub use provenance::BuildProvenance;
pub use result::{BuildTelemetry, FileEntry, Snapshot, SnapshotId, StaleReport};

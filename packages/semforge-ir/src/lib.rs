//! semforge-ir: deterministic tiered semantic IR build & cache.
//!
//! The core of a code-intelligence engine for AI coding agents: given a
//! set of source files and an analysis depth, produce a deterministic IR
//! (structural, semantic, graph) and reuse prior work whenever safe.
//!
//! Subsystems:
//! - `features::structural`: canonical per-file structural IR
//! - `features::cache`: three-tier content-addressed cache (L0/L1/L2)
//! - `features::semantic`: tier-planned semantic layers
//!   (CFG → DFG → expressions → SSA/PDG) and the tier planner
//! - `features::incremental`: change detection, scope expansion,
//!   impact analysis, snapshot GC
//! - `features::graph`: typed graph materialization with reverse indexes
//! - `pipeline`: the coordinator, worker dispatch, deterministic merge,
//!   snapshots with build provenance
//!
//! ```no_run
//! use std::sync::Arc;
//! use semforge_ir::config::BuildConfig;
//! use semforge_ir::features::incremental::SourceFile;
//! use semforge_ir::pipeline::Builder;
//! # fn parser() -> Arc<dyn semforge_ir::shared::ports::StructuralParser> { unimplemented!() }
//!
//! let config = BuildConfig::default().apply_env().unwrap();
//! let builder = Builder::new(parser(), &config).unwrap();
//! let files: Vec<SourceFile> = Vec::new();
//! let snapshot = builder.build(&files, &config).unwrap();
//! let _graph = snapshot.graph();
//! ```

pub mod config;
pub mod errors;
pub mod features;
pub mod pipeline;
pub mod shared;

pub use config::{BuildConfig, Preset};
pub use errors::{Result, SemforgeError};
pub use features::cache::{
    CacheStats, ConfigHash, ContentHash, FileId, FileMetadata, Hash128, Language,
    SemanticCacheKey, StructuralDigest,
};
pub use features::graph::{EdgeStatus, GraphDocument};
pub use features::incremental::{ChangeSet, ReindexPolicy, SourceFile};
pub use features::semantic::{
    AgentIntent, Planner, QueryType, Scope, SemanticIR, SemanticTier, TierPlan,
};
pub use features::structural::StructuralIR;
pub use pipeline::{Builder, BuildProvenance, Snapshot, SnapshotId};

//! Typed pipeline errors.
//!
//! Per-file failures become `BuildFault`s collected on the snapshot; only
//! configuration, plan and cancellation errors surface to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::features::cache::FileId;
use crate::features::semantic::PlanError;

/// Stage a per-file fault occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildStage {
    Parse,
    Signatures,
    Flow,
    Expressions,
    DataFlow,
    Ssa,
    Graph,
}

impl BuildStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStage::Parse => "parse",
            BuildStage::Signatures => "signatures",
            BuildStage::Flow => "flow",
            BuildStage::Expressions => "expressions",
            BuildStage::DataFlow => "data_flow",
            BuildStage::Ssa => "ssa",
            BuildStage::Graph => "graph",
        }
    }
}

/// One file's failure. The build carries on; the snapshot is marked
/// partial and lists its faults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFault {
    pub file: FileId,
    pub stage: BuildStage,
    pub reason: String,
}

impl std::fmt::Display for BuildFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed at {}: {}", self.file, self.stage.as_str(), self.reason)
    }
}

/// Hard failures surfaced to the caller.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Composition-root failure (cache directories, worker pool).
    #[error("builder init failed: {0}")]
    Init(String),

    #[error("build cancelled")]
    Cancelled,
}

pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let fault = BuildFault {
            file: FileId::new("a.py"),
            stage: BuildStage::Parse,
            reason: "unexpected token".into(),
        };
        assert_eq!(fault.to_string(), "a.py failed at parse: unexpected token");
    }
}

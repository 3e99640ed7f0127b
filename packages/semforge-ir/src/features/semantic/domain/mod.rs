//! Semantic IR domain models.

pub mod cfg;
pub mod dfg;
pub mod expression;
pub mod ir;
pub mod signature;
pub mod ssa;
pub mod tier;

pub use cfg::{CfgBlock, CfgBlockKind, CfgEdge, CfgEdgeKind, ControlFlowGraph};
pub use dfg::{DataFlowGraph, DfgEdge, DfgEdgeKind, DfgEvent, DfgOp, DfgVariable, DfgVariableKind};
pub use expression::{ExprKind, Expression};
pub use ir::SemanticIR;
pub use signature::{ResolutionLevel, Signature, SignatureParam, TypeRef};
pub use ssa::{DominatorTree, PdgEdgeKind, PhiNode, ProgramDependenceGraph, SsaForm, SsaVariable};
pub use tier::{SemanticLayer, SemanticTier, TierOptions};

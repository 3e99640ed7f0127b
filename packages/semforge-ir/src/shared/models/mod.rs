//! Shared models

mod edge;
pub mod hints;
mod node;
mod span;

pub use edge::{Edge, EdgeKind};
pub use hints::{Handler, Stmt, StmtHint};
pub use node::{
    ClassAttrs, FunctionAttrs, ImportAttrs, Node, NodeAttrs, NodeId, NodeKind, ParamHint,
    VariableAttrs,
};
pub use span::Span;

// Re-export serde_json::Value for convenience (used by NodeAttrs::Other)
pub use serde_json::Value;

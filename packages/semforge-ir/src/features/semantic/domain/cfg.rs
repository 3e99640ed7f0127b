//! Control flow graph model.

use serde::{Deserialize, Serialize};

use crate::shared::models::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfgBlockKind {
    Entry,
    Exit,
    Body,
    Branch,
    LoopHead,
    Handler,
    FinallyBlock,
}

/// CFG basic block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgBlock {
    pub id: String,
    pub kind: CfgBlockKind,
    pub span: Span,
    /// Rendered statement tags carried over from the AST hints.
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CfgEdgeKind {
    Normal,
    TrueBranch,
    FalseBranch,
    Exception,
    LoopBack,
    Break,
    Continue,
    Return,
}

impl CfgEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfgEdgeKind::Normal => "normal",
            CfgEdgeKind::TrueBranch => "true_branch",
            CfgEdgeKind::FalseBranch => "false_branch",
            CfgEdgeKind::Exception => "exception",
            CfgEdgeKind::LoopBack => "loop_back",
            CfgEdgeKind::Break => "break",
            CfgEdgeKind::Continue => "continue",
            CfgEdgeKind::Return => "return",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgEdge {
    pub source: String,
    pub target: String,
    pub kind: CfgEdgeKind,
}

impl CfgEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: CfgEdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

/// Per-function control flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub function_id: String,
    pub entry: String,
    pub exit: String,
    pub blocks: Vec<CfgBlock>,
    pub edges: Vec<CfgEdge>,
}

impl ControlFlowGraph {
    pub fn block(&self, id: &str) -> Option<&CfgBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.as_str())
            .collect()
    }

    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Canonicalize block and edge order.
    pub fn normalize(&mut self) {
        self.blocks.sort_by(|a, b| a.id.cmp(&b.id));
        self.edges.sort_by(|a, b| {
            (&a.source, &a.target, a.kind.as_str()).cmp(&(&b.source, &b.target, b.kind.as_str()))
        });
        self.edges.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successors_predecessors() {
        let cfg = ControlFlowGraph {
            function_id: "f".into(),
            entry: "b0".into(),
            exit: "b2".into(),
            blocks: vec![],
            edges: vec![
                CfgEdge::new("b0", "b1", CfgEdgeKind::Normal),
                CfgEdge::new("b1", "b2", CfgEdgeKind::Return),
            ],
        };
        assert_eq!(cfg.successors("b0"), vec!["b1"]);
        assert_eq!(cfg.predecessors("b2"), vec!["b1"]);
    }

    #[test]
    fn test_normalize_dedups_edges() {
        let mut cfg = ControlFlowGraph {
            function_id: "f".into(),
            entry: "b0".into(),
            exit: "b1".into(),
            blocks: vec![],
            edges: vec![
                CfgEdge::new("b0", "b1", CfgEdgeKind::Normal),
                CfgEdge::new("b0", "b1", CfgEdgeKind::Normal),
            ],
        };
        cfg.normalize();
        assert_eq!(cfg.edges.len(), 1);
    }
}

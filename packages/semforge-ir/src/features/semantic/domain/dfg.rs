//! Data flow graph model (function-local; interprocedural edges at FULL).

use serde::{Deserialize, Serialize};

use crate::shared::models::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DfgVariableKind {
    Param,
    Local,
    Captured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfgVariable {
    pub id: String,
    pub name: String,
    pub kind: DfgVariableKind,
    /// Enclosing function id
    pub scope: String,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DfgOp {
    Read,
    Write,
}

/// One read/write of a variable inside a CFG block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfgEvent {
    pub variable_id: String,
    pub block_id: String,
    pub op: DfgOp,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DfgEdgeKind {
    Alias,
    Assign,
    ParamToArg,
    Return,
}

impl DfgEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DfgEdgeKind::Alias => "alias",
            DfgEdgeKind::Assign => "assign",
            DfgEdgeKind::ParamToArg => "param_to_arg",
            DfgEdgeKind::Return => "return",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfgEdge {
    pub from_variable: String,
    pub to_variable: String,
    pub kind: DfgEdgeKind,
}

impl DfgEdge {
    pub fn new(
        from_variable: impl Into<String>,
        to_variable: impl Into<String>,
        kind: DfgEdgeKind,
    ) -> Self {
        Self {
            from_variable: from_variable.into(),
            to_variable: to_variable.into(),
            kind,
        }
    }
}

/// Per-function data flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlowGraph {
    pub function_id: String,
    pub variables: Vec<DfgVariable>,
    pub events: Vec<DfgEvent>,
    pub edges: Vec<DfgEdge>,
}

impl DataFlowGraph {
    pub fn variable(&self, id: &str) -> Option<&DfgVariable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn writes_of(&self, variable_id: &str) -> Vec<&DfgEvent> {
        self.events
            .iter()
            .filter(|e| e.variable_id == variable_id && e.op == DfgOp::Write)
            .collect()
    }

    pub fn reads_of(&self, variable_id: &str) -> Vec<&DfgEvent> {
        self.events
            .iter()
            .filter(|e| e.variable_id == variable_id && e.op == DfgOp::Read)
            .collect()
    }

    /// Canonicalize variable, event and edge order.
    pub fn normalize(&mut self) {
        self.variables.sort_by(|a, b| a.id.cmp(&b.id));
        self.events.sort_by(|a, b| {
            (&a.variable_id, &a.block_id, a.op == DfgOp::Write)
                .cmp(&(&b.variable_id, &b.block_id, b.op == DfgOp::Write))
        });
        self.edges.sort_by(|a, b| {
            (&a.from_variable, &a.to_variable, a.kind)
                .cmp(&(&b.from_variable, &b.to_variable, b.kind))
        });
        self.edges.dedup();
    }
}

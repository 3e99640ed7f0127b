//! Expression IR model.

use serde::{Deserialize, Serialize};

use crate::shared::models::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    Call,
    Name,
    Assign,
    AugAssign,
    Return,
    Compare,
    Iter,
    Raise,
}

impl ExprKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExprKind::Call => "call",
            ExprKind::Name => "name",
            ExprKind::Assign => "assign",
            ExprKind::AugAssign => "aug_assign",
            ExprKind::Return => "return",
            ExprKind::Compare => "compare",
            ExprKind::Iter => "iter",
            ExprKind::Raise => "raise",
        }
    }
}

/// One expression occurrence, linked to types and symbols after inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: String,
    pub kind: ExprKind,
    pub span: Span,
    /// Variable names read by the expression
    pub reads: Vec<String>,
    /// Variable name defined, for assignment-like expressions
    pub defines: Option<String>,
    /// Callee name, for call expressions
    pub callee: Option<String>,
    /// Inferred (or annotation-derived) type name
    pub inferred_type: Option<String>,
    /// Resolved symbol id of the type, after linking
    pub symbol_id: Option<String>,
}

impl Expression {
    pub fn new(id: impl Into<String>, kind: ExprKind, span: Span) -> Self {
        Self {
            id: id.into(),
            kind,
            span,
            reads: Vec::new(),
            defines: None,
            callee: None,
            inferred_type: None,
            symbol_id: None,
        }
    }

    pub fn with_reads(mut self, reads: Vec<String>) -> Self {
        self.reads = reads;
        self
    }

    pub fn with_defines(mut self, defines: impl Into<String>) -> Self {
        self.defines = Some(defines.into());
        self
    }

    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = Some(callee.into());
        self
    }

    /// Rendered text used for batched inference queries.
    pub fn render(&self) -> String {
        match (&self.callee, &self.defines) {
            (Some(callee), Some(target)) => {
                format!("{target} = {callee}({})", self.reads.join(", "))
            }
            (Some(callee), None) => format!("{callee}({})", self.reads.join(", ")),
            (None, Some(target)) => format!("{target} = {}", self.reads.join(" ")),
            (None, None) => self.reads.join(" "),
        }
    }
}

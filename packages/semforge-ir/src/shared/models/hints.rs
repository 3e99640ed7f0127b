//! Statement-level AST hints carried on structural function nodes.
//!
//! Parsers are external to this crate; they attach a lowered statement
//! outline to each function so the semantic layers (CFG, DFG, SSA) can be
//! built without re-parsing source text. Hints are deliberately coarse:
//! names only, no expressions trees, no literals.

use serde::{Deserialize, Serialize};

use super::span::Span;

/// One lowered statement with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub span: Span,
    pub hint: StmtHint,
}

impl Stmt {
    pub fn new(span: Span, hint: StmtHint) -> Self {
        Self { span, hint }
    }
}

/// Lowered statement shape.
///
/// `reads` lists variable names consumed by the statement; assignment
/// targets are separate so data-flow construction never has to guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtHint {
    /// `target = <expr over reads>`
    Assign {
        target: String,
        reads: Vec<String>,
        call: Option<String>,
    },
    /// `target op= <expr over reads>` (reads implicitly include target)
    AugAssign { target: String, reads: Vec<String> },
    /// Bare expression statement, possibly a call
    Expr {
        reads: Vec<String>,
        call: Option<String>,
    },
    Return {
        reads: Vec<String>,
    },
    Raise {
        exception: Option<String>,
    },
    If {
        cond_reads: Vec<String>,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond_reads: Vec<String>,
        body: Vec<Stmt>,
    },
    For {
        target: String,
        iter_reads: Vec<String>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        finally: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
}

/// Exception handler arm of a `Try`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    /// Exception type name, `None` for a bare catch-all
    pub exception: Option<String>,
    pub body: Vec<Stmt>,
}

impl StmtHint {
    /// Variable names this statement reads.
    pub fn reads(&self) -> &[String] {
        match self {
            StmtHint::Assign { reads, .. }
            | StmtHint::AugAssign { reads, .. }
            | StmtHint::Expr { reads, .. }
            | StmtHint::Return { reads } => reads,
            StmtHint::If { cond_reads, .. } | StmtHint::While { cond_reads, .. } => cond_reads,
            StmtHint::For { iter_reads, .. } => iter_reads,
            _ => &[],
        }
    }

    /// Variable name this statement writes, if any.
    pub fn write_target(&self) -> Option<&str> {
        match self {
            StmtHint::Assign { target, .. }
            | StmtHint::AugAssign { target, .. }
            | StmtHint::For { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Callee name, when the statement is (or contains) a call.
    pub fn callee(&self) -> Option<&str> {
        match self {
            StmtHint::Assign { call, .. } | StmtHint::Expr { call, .. } => call.as_deref(),
            _ => None,
        }
    }

    /// Short tag used when rendering CFG block statements.
    pub fn tag(&self) -> &'static str {
        match self {
            StmtHint::Assign { .. } => "assign",
            StmtHint::AugAssign { .. } => "aug_assign",
            StmtHint::Expr { .. } => "expr",
            StmtHint::Return { .. } => "return",
            StmtHint::Raise { .. } => "raise",
            StmtHint::If { .. } => "if",
            StmtHint::While { .. } => "while",
            StmtHint::For { .. } => "for",
            StmtHint::Try { .. } => "try",
            StmtHint::Break => "break",
            StmtHint::Continue => "continue",
            StmtHint::Pass => "pass",
        }
    }
}

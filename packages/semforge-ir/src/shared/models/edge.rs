//! Structural IR edges.

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    Contains,
    Imports,
    Inherits,
    Implements,
    Calls,
    References,
    Reads,
    Writes,
    Defines,
    Decorates,
    Raises,
    Instantiates,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Imports => "imports",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Implements => "implements",
            EdgeKind::Calls => "calls",
            EdgeKind::References => "references",
            EdgeKind::Reads => "reads",
            EdgeKind::Writes => "writes",
            EdgeKind::Defines => "defines",
            EdgeKind::Decorates => "decorates",
            EdgeKind::Raises => "raises",
            EdgeKind::Instantiates => "instantiates",
        }
    }

    /// Edge kinds that may cross file boundaries.
    pub fn is_cross_file(&self) -> bool {
        matches!(
            self,
            EdgeKind::Imports
                | EdgeKind::Inherits
                | EdgeKind::Implements
                | EdgeKind::Calls
                | EdgeKind::References
                | EdgeKind::Instantiates
        )
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural IR edge.
///
/// When `external` is set, `target_id` is the FQN of a symbol outside this
/// file; otherwise both endpoints must resolve to in-file node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: EdgeKind,
    pub span: Option<Span>,
    pub external: bool,
}

impl Edge {
    pub fn new(source_id: impl Into<NodeId>, target_id: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            span: None,
            external: false,
        }
    }

    pub fn external(source_id: impl Into<NodeId>, target_fqn: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_fqn.into(),
            kind,
            span: None,
            external: true,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Canonical sort key: `(source, target, kind-as-string)`.
    pub fn sort_key(&self) -> (&str, &str, &'static str) {
        (&self.source_id, &self.target_id, self.kind.as_str())
    }
}

//! Typed graph document: the merged view of structural + semantic IR.
//!
//! Nodes and edges are kept in canonical order (nodes by id, edges by
//! `(source, target, kind)`), so two graphs built from the same inputs are
//! byte-identical when serialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::features::cache::{EstimateSize, FileId, Hash128};
use crate::shared::models::{NodeKind, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GraphNodeKind {
    // Structural
    File,
    Module,
    Class,
    Interface,
    Enum,
    Function,
    Method,
    Lambda,
    Variable,
    Parameter,
    Field,
    Constant,
    Property,
    TypeAlias,
    Import,
    Decorator,
    // Semantic
    CfgBlock,
    DfgVariable,
    Expression,
    Signature,
    TypeEntity,
    ExternalSymbol,
}

impl From<NodeKind> for GraphNodeKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::File => GraphNodeKind::File,
            NodeKind::Module => GraphNodeKind::Module,
            NodeKind::Class => GraphNodeKind::Class,
            NodeKind::Interface => GraphNodeKind::Interface,
            NodeKind::Enum => GraphNodeKind::Enum,
            NodeKind::Function => GraphNodeKind::Function,
            NodeKind::Method => GraphNodeKind::Method,
            NodeKind::Lambda => GraphNodeKind::Lambda,
            NodeKind::Variable => GraphNodeKind::Variable,
            NodeKind::Parameter => GraphNodeKind::Parameter,
            NodeKind::Field => GraphNodeKind::Field,
            NodeKind::Constant => GraphNodeKind::Constant,
            NodeKind::Property => GraphNodeKind::Property,
            NodeKind::TypeAlias => GraphNodeKind::TypeAlias,
            NodeKind::Import => GraphNodeKind::Import,
            NodeKind::Decorator => GraphNodeKind::Decorator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GraphEdgeKind {
    // Structural
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
    // Control flow
    HasBlock,
    FlowNormal,
    FlowTrue,
    FlowFalse,
    FlowException,
    FlowLoopBack,
    FlowBreak,
    FlowContinue,
    FlowReturn,
    // Data flow
    HasVariable,
    DataAlias,
    DataAssign,
    DataParamToArg,
    DataReturn,
    // Types and expressions
    HasExpression,
    HasSignature,
    HasType,
    UsesType,
}

impl GraphEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphEdgeKind::Contains => "contains",
            GraphEdgeKind::Imports => "imports",
            GraphEdgeKind::Inherits => "inherits",
            GraphEdgeKind::Implements => "implements",
            GraphEdgeKind::Calls => "calls",
            GraphEdgeKind::References => "references",
            GraphEdgeKind::Reads => "reads",
            GraphEdgeKind::Writes => "writes",
            GraphEdgeKind::Defines => "defines",
            GraphEdgeKind::Decorates => "decorates",
            GraphEdgeKind::Raises => "raises",
            GraphEdgeKind::Instantiates => "instantiates",
            GraphEdgeKind::HasBlock => "has_block",
            GraphEdgeKind::FlowNormal => "flow_normal",
            GraphEdgeKind::FlowTrue => "flow_true",
            GraphEdgeKind::FlowFalse => "flow_false",
            GraphEdgeKind::FlowException => "flow_exception",
            GraphEdgeKind::FlowLoopBack => "flow_loop_back",
            GraphEdgeKind::FlowBreak => "flow_break",
            GraphEdgeKind::FlowContinue => "flow_continue",
            GraphEdgeKind::FlowReturn => "flow_return",
            GraphEdgeKind::HasVariable => "has_variable",
            GraphEdgeKind::DataAlias => "data_alias",
            GraphEdgeKind::DataAssign => "data_assign",
            GraphEdgeKind::DataParamToArg => "data_param_to_arg",
            GraphEdgeKind::DataReturn => "data_return",
            GraphEdgeKind::HasExpression => "has_expression",
            GraphEdgeKind::HasSignature => "has_signature",
            GraphEdgeKind::HasType => "has_type",
            GraphEdgeKind::UsesType => "uses_type",
        }
    }
}

/// Status of a cross-file backward edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EdgeStatus {
    #[default]
    Valid,
    /// Target file changed since the edge was recorded; needs lazy
    /// re-validation.
    Stale,
    /// Re-validation found the target gone.
    Invalid,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: GraphNodeKind,
    pub name: String,
    pub fqn: String,
    pub file: Option<FileId>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: GraphEdgeKind,
    pub status: EdgeStatus,
    pub cross_file: bool,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: GraphEdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            status: EdgeStatus::Valid,
            cross_file: false,
        }
    }

    pub fn cross_file(mut self) -> Self {
        self.cross_file = true;
        self
    }

    pub fn sort_key(&self) -> (&str, &str, &'static str) {
        (&self.source, &self.target, self.kind.as_str())
    }
}

/// Reverse adjacency indexes for O(1) queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphIndexes {
    pub called_by: BTreeMap<String, Vec<String>>,
    pub imported_by: BTreeMap<String, Vec<String>>,
    pub inherited_by: BTreeMap<String, Vec<String>>,
    pub type_users: BTreeMap<String, Vec<String>>,
    pub reads_by: BTreeMap<String, Vec<String>>,
    pub writes_by: BTreeMap<String, Vec<String>>,
}

/// The merged, indexed graph. Owned by a snapshot; queries get `&self`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDocument {
    pub repo_id: String,
    /// Sorted by id
    pub nodes: Vec<GraphNode>,
    /// Sorted by `(source, target, kind)`, duplicates collapsed
    pub edges: Vec<GraphEdge>,
    pub indexes: GraphIndexes,
    #[serde(skip)]
    node_index: AHashMap<String, usize>,
}

// Manual impl: the id index is derived state and must be rebuilt when a
// document comes back from the disk cache.
impl<'de> Deserialize<'de> for GraphDocument {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            repo_id: String,
            nodes: Vec<GraphNode>,
            edges: Vec<GraphEdge>,
            indexes: GraphIndexes,
        }
        let raw = Raw::deserialize(deserializer)?;
        let mut doc = GraphDocument {
            repo_id: raw.repo_id,
            nodes: raw.nodes,
            edges: raw.edges,
            indexes: raw.indexes,
            node_index: AHashMap::new(),
        };
        doc.rebuild_node_index();
        Ok(doc)
    }
}

impl PartialEq for GraphDocument {
    fn eq(&self, other: &Self) -> bool {
        self.repo_id == other.repo_id && self.nodes == other.nodes && self.edges == other.edges
    }
}

impl GraphDocument {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            indexes: GraphIndexes::default(),
            node_index: AHashMap::new(),
        }
    }

    /// Sort, dedup and rebuild the id index. Must be called after any
    /// direct mutation of `nodes`/`edges`.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.nodes.dedup_by(|a, b| a.id == b.id);
        self.edges
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.edges
            .dedup_by(|a, b| a.sort_key() == b.sort_key());
        self.rebuild_node_index();
    }

    pub fn rebuild_node_index(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn edges_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn called_by(&self, id: &str) -> &[String] {
        self.indexes
            .called_by
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn imported_by(&self, id: &str) -> &[String] {
        self.indexes
            .imported_by
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn inherited_by(&self, id: &str) -> &[String] {
        self.indexes
            .inherited_by
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mark backward edges into a changed file as stale: edges whose
    /// target lives in the changed file and whose source lives elsewhere.
    /// Returns the number of edges marked.
    pub fn mark_stale_for_file(&mut self, changed: &FileId) -> usize {
        let eligible: Vec<bool> = self
            .edges
            .iter()
            .map(|e| {
                let target_in_changed = self
                    .node(&e.target)
                    .and_then(|n| n.file.as_ref())
                    .map(|f| f == changed)
                    .unwrap_or(false);
                let source_elsewhere = self
                    .node(&e.source)
                    .and_then(|n| n.file.as_ref())
                    .map(|f| f != changed)
                    .unwrap_or(false);
                target_in_changed && source_elsewhere
            })
            .collect();
        let mut marked = 0;
        for (edge, eligible) in self.edges.iter_mut().zip(eligible) {
            if eligible && edge.cross_file && edge.status == EdgeStatus::Valid {
                edge.status = EdgeStatus::Stale;
                marked += 1;
            }
        }
        marked
    }

    /// Lazy re-validation of one stale edge: `Valid` when the target still
    /// resolves, `Invalid` otherwise.
    pub fn revalidate_edge(&mut self, index: usize) -> EdgeStatus {
        let target_exists = {
            let edge = &self.edges[index];
            self.contains_node(&edge.target)
        };
        let edge = &mut self.edges[index];
        edge.status = if target_exists {
            EdgeStatus::Valid
        } else {
            EdgeStatus::Invalid
        };
        edge.status
    }

    /// Re-validate every remaining stale edge (commit-time sweep; nothing
    /// stays `Stale` past a full build).
    pub fn revalidate_all_stale(&mut self) -> (usize, usize) {
        let stale: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == EdgeStatus::Stale)
            .map(|(i, _)| i)
            .collect();
        let mut valid = 0;
        let mut invalid = 0;
        for index in stale {
            match self.revalidate_edge(index) {
                EdgeStatus::Valid => valid += 1,
                EdgeStatus::Invalid => invalid += 1,
                _ => {}
            }
        }
        (valid, invalid)
    }

    pub fn stale_edge_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.status == EdgeStatus::Stale)
            .count()
    }

    /// Digest over the canonical serialized form. Equal digests mean
    /// node- and edge-identical graphs.
    pub fn digest(&self) -> Hash128 {
        let canonical = (&self.repo_id, &self.nodes, &self.edges);
        let bytes = rmp_serde::to_vec(&canonical).expect("graph encodes");
        Hash128::compute(&bytes)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl EstimateSize for GraphDocument {
    fn estimated_size_bytes(&self) -> usize {
        let nodes: usize = self
            .nodes
            .iter()
            .map(|n| n.id.len() + n.name.len() + n.fqn.len() + 80)
            .sum();
        let edges: usize = self
            .edges
            .iter()
            .map(|e| e.source.len() + e.target.len() + 32)
            .sum();
        std::mem::size_of::<Self>() + nodes + edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: GraphNodeKind, file: Option<&str>) -> GraphNode {
        GraphNode {
            id: id.into(),
            kind,
            name: id.into(),
            fqn: id.into(),
            file: file.map(FileId::new),
            span: None,
        }
    }

    fn two_file_graph() -> GraphDocument {
        let mut graph = GraphDocument::new("repo");
        graph.nodes.push(node("a::f", GraphNodeKind::Function, Some("a.py")));
        graph.nodes.push(node("b::g", GraphNodeKind::Function, Some("b.py")));
        graph.edges.push(
            GraphEdge::new("a::f", "b::g", GraphEdgeKind::Calls).cross_file(),
        );
        graph.canonicalize();
        graph
    }

    #[test]
    fn test_canonical_ordering_and_digest() {
        let a = two_file_graph();
        let mut b = GraphDocument::new("repo");
        // Insert in reverse order; canonical form must match.
        b.nodes.push(node("b::g", GraphNodeKind::Function, Some("b.py")));
        b.nodes.push(node("a::f", GraphNodeKind::Function, Some("a.py")));
        b.edges.push(
            GraphEdge::new("a::f", "b::g", GraphEdgeKind::Calls).cross_file(),
        );
        b.canonicalize();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a, b);
    }

    #[test]
    fn test_stale_marking_and_revalidation() {
        let mut graph = two_file_graph();
        let marked = graph.mark_stale_for_file(&FileId::new("b.py"));
        assert_eq!(marked, 1);
        assert_eq!(graph.stale_edge_count(), 1);

        // Target still exists: edge returns to Valid.
        let (valid, invalid) = graph.revalidate_all_stale();
        assert_eq!((valid, invalid), (1, 0));
        assert_eq!(graph.stale_edge_count(), 0);
    }

    #[test]
    fn test_revalidation_invalidates_missing_target() {
        let mut graph = two_file_graph();
        graph.mark_stale_for_file(&FileId::new("b.py"));
        // Target removed (e.g. function deleted in the edit).
        graph.nodes.retain(|n| n.id != "b::g");
        graph.rebuild_node_index();

        let (valid, invalid) = graph.revalidate_all_stale();
        assert_eq!((valid, invalid), (0, 1));
        assert!(graph.edges.iter().any(|e| e.status == EdgeStatus::Invalid));
    }

    #[test]
    fn test_deserialized_graph_keeps_lookups() {
        let graph = two_file_graph();
        let bytes = rmp_serde::to_vec(&graph).unwrap();
        let decoded: GraphDocument = rmp_serde::from_slice(&bytes).unwrap();

        assert_eq!(decoded, graph);
        assert!(decoded.contains_node("a::f"));
        assert_eq!(decoded.digest(), graph.digest());
    }

    #[test]
    fn test_same_file_edges_never_marked() {
        let mut graph = GraphDocument::new("repo");
        graph.nodes.push(node("a::f", GraphNodeKind::Function, Some("a.py")));
        graph.nodes.push(node("a::g", GraphNodeKind::Function, Some("a.py")));
        graph.edges.push(GraphEdge::new("a::f", "a::g", GraphEdgeKind::Calls));
        graph.canonicalize();

        assert_eq!(graph.mark_stale_for_file(&FileId::new("a.py")), 0);
    }
}

//! Structural IR document with canonical packing.
//!
//! The packed byte form fixes node order (by id) and edge order
//! (`(source, target, kind)`), so the structural digest is independent of
//! the order the parser happened to emit things in. Formatting-only edits
//! the parser normalizes away therefore keep the digest stable.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::features::cache::{ContentHash, EstimateSize, FileId, Language, StructuralDigest};
use crate::shared::models::{Edge, Node, NodeId, NodeKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("duplicate node id {id} in {file}")]
    DuplicateNodeId { file: String, id: String },

    #[error("overlapping sibling spans in {file}: {first} and {second}")]
    OverlappingSiblings {
        file: String,
        first: String,
        second: String,
    },

    #[error("edge endpoint {id} unresolved in {file} and not tagged external")]
    DanglingEdge { file: String, id: String },
}

/// Immutable per-file structural IR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralIR {
    pub file_id: FileId,
    pub content_hash: ContentHash,
    pub language: Language,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Canonical serialization; lets the digest be computed in O(1).
    /// Dropped from cache records and rebuilt on demand.
    #[serde(skip)]
    packed_bytes: Option<Vec<u8>>,
}

// The memoized packed form is derived state and stays out of equality.
impl PartialEq for StructuralIR {
    fn eq(&self, other: &Self) -> bool {
        self.file_id == other.file_id
            && self.content_hash == other.content_hash
            && self.language == other.language
            && self.nodes == other.nodes
            && self.edges == other.edges
    }
}

impl StructuralIR {
    pub fn new(
        file_id: FileId,
        content_hash: ContentHash,
        language: Language,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            file_id,
            content_hash,
            language,
            nodes,
            edges,
            packed_bytes: None,
        }
    }

    /// Canonicalize node and edge order in place, then memoize the packed
    /// byte form. Parsers call this once before handing the IR over.
    pub fn seal(mut self) -> Self {
        self.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.packed_bytes = Some(self.pack());
        self
    }

    /// Canonical byte layout. Nodes sorted by id, edges by
    /// `(source, target, kind)`; msgpack tuple encoding throughout.
    ///
    /// Path and raw content identity are both excluded: a rename, or an
    /// edit the parser normalizes away (whitespace), keeps the digest
    /// stable.
    fn pack(&self) -> Vec<u8> {
        let mut nodes = self.nodes.clone();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges = self.edges.clone();
        edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let canonical = (self.language, nodes, edges);
        rmp_serde::to_vec(&canonical).expect("structural IR packs")
    }

    /// Packed bytes, memoized by `seal`.
    pub fn packed_bytes(&self) -> Vec<u8> {
        match &self.packed_bytes {
            Some(bytes) => bytes.clone(),
            None => self.pack(),
        }
    }

    /// Digest over the canonical byte layout: the identity of structure
    /// independent of path and of formatting the parser normalizes away.
    pub fn digest(&self) -> StructuralDigest {
        match &self.packed_bytes {
            Some(bytes) => StructuralDigest::compute(bytes),
            None => StructuralDigest::compute(&self.pack()),
        }
    }

    /// The same IR under a new path (cache hits after a rename). The
    /// digest is path-independent, so packed bytes carry over.
    pub fn rebind(&self, file_id: FileId) -> Self {
        let mut ir = self.clone();
        ir.file_id = file_id;
        ir
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Callable nodes (functions, methods, lambdas), in id order.
    pub fn callables(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind.is_callable())
    }

    /// Import nodes, in id order.
    pub fn imports(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Import)
    }

    /// Validate the structural invariants.
    pub fn validate(&self) -> Result<(), StructuralError> {
        let file = self.file_id.to_string();

        // Node ids unique within the file.
        let mut ids: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(&node.id) {
                return Err(StructuralError::DuplicateNodeId {
                    file,
                    id: node.id.clone(),
                });
            }
        }

        // Sibling spans of the same kind must not overlap.
        let mut children: HashMap<&str, Vec<&Node>> = HashMap::new();
        for edge in self.containment_edges() {
            if let Some(node) = self.node(&edge.target_id) {
                children.entry(edge.source_id.as_str()).or_default().push(node);
            }
        }
        for siblings in children.values() {
            for (i, a) in siblings.iter().enumerate() {
                for b in &siblings[i + 1..] {
                    if a.kind == b.kind && a.span.overlaps(&b.span) {
                        return Err(StructuralError::OverlappingSiblings {
                            file,
                            first: a.id.clone(),
                            second: b.id.clone(),
                        });
                    }
                }
            }
        }

        // Every edge endpoint resolves in-file or is tagged external.
        for edge in &self.edges {
            if !ids.contains(edge.source_id.as_str()) {
                return Err(StructuralError::DanglingEdge {
                    file,
                    id: edge.source_id.clone(),
                });
            }
            if !edge.external && !ids.contains(edge.target_id.as_str()) {
                return Err(StructuralError::DanglingEdge {
                    file,
                    id: edge.target_id.clone(),
                });
            }
        }

        Ok(())
    }

    fn containment_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(|e| e.kind == crate::shared::models::EdgeKind::Contains)
    }

    /// Node ids defined in this file, for cross-file edge validation.
    pub fn node_ids(&self) -> HashSet<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// FQNs defined in this file.
    pub fn defined_fqns(&self) -> HashSet<String> {
        self.nodes.iter().map(|n| n.fqn.clone()).collect()
    }
}

impl EstimateSize for StructuralIR {
    fn estimated_size_bytes(&self) -> usize {
        // Coarse but monotone with real size; serialized form dominates.
        let node_bytes: usize = self
            .nodes
            .iter()
            .map(|n| n.id.len() + n.name.len() + n.fqn.len() + 64)
            .sum();
        let edge_bytes: usize = self
            .edges
            .iter()
            .map(|e| e.source_id.len() + e.target_id.len() + 24)
            .sum();
        std::mem::size_of::<Self>() + node_bytes + edge_bytes
    }
}

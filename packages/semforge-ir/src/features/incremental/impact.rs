//! Symbol-level impact analysis over the reverse dependency graph.
//!
//! Direct impact is the union of reverse edges of the changed symbols;
//! transitive impact is a bounded BFS (sorted node order, so results are
//! deterministic). Exceeding the budget truncates and flags the result
//! rather than failing.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::features::cache::FileId;
use crate::features::graph::GraphDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolChangeKind {
    Added,
    Deleted,
    SignatureChanged,
    BodyChanged,
    TypeChanged,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolChange {
    pub fqn: String,
    pub kind: SymbolChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactBudget {
    pub max_depth: usize,
    pub max_affected: usize,
}

impl Default for ImpactBudget {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_affected: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    /// Node ids directly depending on a changed symbol, sorted
    pub direct: Vec<String>,
    /// Full bounded closure (includes direct), sorted
    pub transitive: Vec<String>,
    pub affected_files: Vec<FileId>,
    /// Budget was hit; the result is a truncated under-approximation.
    pub truncated: bool,
}

/// Analyze the impact of a set of symbol changes.
pub fn analyze_impact(
    graph: &GraphDocument,
    changes: &[SymbolChange],
    budget: ImpactBudget,
) -> ImpactResult {
    // Seed: node ids of the changed symbols, sorted.
    let mut seeds: BTreeSet<String> = BTreeSet::new();
    for change in changes {
        for node in graph.nodes.iter().filter(|n| n.fqn == change.fqn) {
            seeds.insert(node.id.clone());
        }
    }

    let mut direct: BTreeSet<String> = BTreeSet::new();
    for seed in &seeds {
        for dependent in reverse_of(graph, seed) {
            direct.insert(dependent);
        }
    }

    // Bounded BFS from the direct set.
    let mut transitive: BTreeSet<String> = direct.clone();
    let mut frontier: VecDeque<(String, usize)> =
        direct.iter().map(|id| (id.clone(), 1)).collect();
    let mut truncated = false;

    while let Some((id, depth)) = frontier.pop_front() {
        if depth >= budget.max_depth {
            truncated = true;
            continue;
        }
        for dependent in reverse_of(graph, &id) {
            if transitive.contains(&dependent) || seeds.contains(&dependent) {
                continue;
            }
            if transitive.len() >= budget.max_affected {
                truncated = true;
                frontier.clear();
                break;
            }
            transitive.insert(dependent.clone());
            frontier.push_back((dependent, depth + 1));
        }
    }

    let affected_files: BTreeSet<FileId> = transitive
        .iter()
        .filter_map(|id| graph.node(id).and_then(|n| n.file.clone()))
        .collect();

    ImpactResult {
        direct: direct.into_iter().collect(),
        transitive: transitive.into_iter().collect(),
        affected_files: affected_files.into_iter().collect(),
        truncated,
    }
}

/// Reverse dependencies of one node, in sorted order.
fn reverse_of(graph: &GraphDocument, id: &str) -> Vec<String> {
    let mut out: BTreeSet<String> = BTreeSet::new();
    out.extend(graph.called_by(id).iter().cloned());
    out.extend(graph.inherited_by(id).iter().cloned());
    out.extend(graph.imported_by(id).iter().cloned());
    out.extend(
        graph
            .indexes
            .type_users
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .cloned(),
    );
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::graph::{
        build_indexes, GraphEdge, GraphEdgeKind, GraphNode, GraphNodeKind,
    };

    /// a → b → c → d call chain (a calls b, etc.)
    fn chain() -> GraphDocument {
        let mut graph = GraphDocument::new("repo");
        for (id, file) in [
            ("a::f", "a.py"),
            ("b::f", "b.py"),
            ("c::f", "c.py"),
            ("d::f", "d.py"),
        ] {
            graph.nodes.push(GraphNode {
                id: id.into(),
                kind: GraphNodeKind::Function,
                name: id.into(),
                fqn: id.replace("::", "."),
                file: Some(FileId::new(file)),
                span: None,
            });
        }
        for (s, t) in [("a::f", "b::f"), ("b::f", "c::f"), ("c::f", "d::f")] {
            graph.edges.push(GraphEdge::new(s, t, GraphEdgeKind::Calls));
        }
        graph.canonicalize();
        graph.indexes = build_indexes(&graph.nodes, &graph.edges);
        graph
    }

    fn change(fqn: &str) -> SymbolChange {
        SymbolChange {
            fqn: fqn.into(),
            kind: SymbolChangeKind::SignatureChanged,
        }
    }

    #[test]
    fn test_direct_and_transitive() {
        let graph = chain();
        let result = analyze_impact(&graph, &[change("d.f")], ImpactBudget::default());

        assert_eq!(result.direct, vec!["c::f".to_string()]);
        assert_eq!(
            result.transitive,
            vec!["a::f".to_string(), "b::f".to_string(), "c::f".to_string()]
        );
        assert_eq!(
            result.affected_files,
            vec![FileId::new("a.py"), FileId::new("b.py"), FileId::new("c.py")]
        );
        assert!(!result.truncated);
    }

    #[test]
    fn test_depth_budget_truncates() {
        let graph = chain();
        let result = analyze_impact(
            &graph,
            &[change("d.f")],
            ImpactBudget {
                max_depth: 1,
                max_affected: 100,
            },
        );
        assert_eq!(result.transitive, vec!["c::f".to_string()]);
        assert!(result.truncated);
    }

    #[test]
    fn test_affected_budget_truncates() {
        let graph = chain();
        let result = analyze_impact(
            &graph,
            &[change("d.f")],
            ImpactBudget {
                max_depth: 10,
                max_affected: 1,
            },
        );
        assert!(result.truncated);
        assert!(result.transitive.len() <= 2);
    }

    #[test]
    fn test_deterministic_order() {
        let graph = chain();
        let a = analyze_impact(&graph, &[change("d.f")], ImpactBudget::default());
        let b = analyze_impact(&graph, &[change("d.f")], ImpactBudget::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_symbol_is_empty() {
        let graph = chain();
        let result = analyze_impact(&graph, &[change("ghost.f")], ImpactBudget::default());
        assert!(result.direct.is_empty());
        assert!(result.transitive.is_empty());
    }
}

//! File-level dependency graph (petgraph-backed).
//!
//! Nodes are files, an edge A → B means A imports from B. Tarjan SCC
//! detects import cycles; the topological order (cycles collapsed) is
//! deterministic. Reverse lookups feed scope expansion.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::features::cache::FileId;
use crate::features::structural::StructuralIR;

#[derive(Debug, Default)]
pub struct FileDependencyGraph {
    graph: DiGraph<FileId, ()>,
    index: BTreeMap<FileId, NodeIndex>,
    cycles: Vec<Vec<FileId>>,
}

impl FileDependencyGraph {
    /// Build from structural IRs: import nodes are matched to project
    /// files through their dotted module path.
    pub fn build(irs: &[Arc<StructuralIR>]) -> Self {
        // module path → file id, derived from file paths.
        let mut modules: BTreeMap<String, FileId> = BTreeMap::new();
        for ir in irs {
            modules.insert(module_path(&ir.file_id), ir.file_id.clone());
        }

        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        for ir in irs {
            let idx = graph.add_node(ir.file_id.clone());
            index.insert(ir.file_id.clone(), idx);
        }

        for ir in irs {
            let from = index[&ir.file_id];
            let mut targets: BTreeSet<FileId> = BTreeSet::new();
            for import in ir.imports() {
                let Some(attrs) = import.import_attrs() else {
                    continue;
                };
                // Exact module match, else the module that defines the
                // imported symbol's parent path.
                let target = modules.get(&attrs.module).cloned().or_else(|| {
                    attrs
                        .module
                        .rsplit_once('.')
                        .and_then(|(parent, _)| modules.get(parent).cloned())
                });
                if let Some(target) = target {
                    if target != ir.file_id {
                        targets.insert(target);
                    }
                }
            }
            for target in targets {
                graph.add_edge(from, index[&target], ());
            }
        }

        let cycles = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut files: Vec<FileId> =
                    scc.into_iter().map(|idx| graph[idx].clone()).collect();
                files.sort();
                files
            })
            .collect();

        Self {
            graph,
            index,
            cycles,
        }
    }

    /// Files that `file` depends on, sorted.
    pub fn dependencies_of(&self, file: &FileId) -> Vec<FileId> {
        self.neighbors(file, Direction::Outgoing)
    }

    /// Files depending on `file` (reverse edges), sorted.
    pub fn dependents_of(&self, file: &FileId) -> Vec<FileId> {
        self.neighbors(file, Direction::Incoming)
    }

    fn neighbors(&self, file: &FileId, direction: Direction) -> Vec<FileId> {
        let Some(&idx) = self.index.get(file) else {
            return Vec::new();
        };
        let mut files: Vec<FileId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn cycles(&self) -> &[Vec<FileId>] {
        &self.cycles
    }

    pub fn file_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Dotted module path for a file: `src/pkg/mod.py` → `src.pkg.mod`.
fn module_path(file: &FileId) -> String {
    let path = file.as_str();
    let without_ext = path.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(path);
    without_ext.replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cache::{ContentHash, Language};
    use crate::shared::models::{ImportAttrs, Node, NodeAttrs, NodeKind, Span};

    fn file_with_imports(path: &str, imports: &[&str]) -> Arc<StructuralIR> {
        let nodes = imports
            .iter()
            .enumerate()
            .map(|(i, module)| {
                Node::new(format!("i{i}"), NodeKind::Import, *module, Span::new(1, 0, 1, 0))
                    .with_attrs(NodeAttrs::Import(ImportAttrs {
                        module: module.to_string(),
                        alias: None,
                        is_external: false,
                    }))
            })
            .collect();
        Arc::new(StructuralIR::new(
            FileId::new(path),
            ContentHash::compute(path.as_bytes()),
            Language::Python,
            nodes,
            vec![],
        ))
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let a = file_with_imports("pkg/a.py", &["pkg.b"]);
        let b = file_with_imports("pkg/b.py", &[]);
        let graph = FileDependencyGraph::build(&[a, b]);

        assert_eq!(
            graph.dependencies_of(&FileId::new("pkg/a.py")),
            vec![FileId::new("pkg/b.py")]
        );
        assert_eq!(
            graph.dependents_of(&FileId::new("pkg/b.py")),
            vec![FileId::new("pkg/a.py")]
        );
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_symbol_import_resolves_to_parent_module() {
        // `from pkg.b import foo` arrives as module "pkg.b.foo".
        let a = file_with_imports("pkg/a.py", &["pkg.b.foo"]);
        let b = file_with_imports("pkg/b.py", &[]);
        let graph = FileDependencyGraph::build(&[a, b]);
        assert_eq!(
            graph.dependencies_of(&FileId::new("pkg/a.py")),
            vec![FileId::new("pkg/b.py")]
        );
    }

    #[test]
    fn test_cycle_detection() {
        let a = file_with_imports("pkg/a.py", &["pkg.b"]);
        let b = file_with_imports("pkg/b.py", &["pkg.a"]);
        let graph = FileDependencyGraph::build(&[a, b]);
        assert_eq!(graph.cycles().len(), 1);
        assert_eq!(graph.cycles()[0].len(), 2);
    }
}

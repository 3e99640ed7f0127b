//! Scope expansion: from a change set to the files that must re-index.
//!
//! Uses the prior graph's reverse indexes (`called_by`, `imported_by`,
//! `inherited_by`) and the file dependency graph. Policies trade
//! freshness for work: Fast re-indexes only what changed, Balanced adds
//! one hop of reverse dependencies, Deep takes the bounded transitive
//! closure.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::change_detector::ChangeSet;
use crate::features::cache::FileId;
use crate::features::graph::{FileDependencyGraph, GraphDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReindexPolicy {
    /// Changed files only
    Fast,
    /// Changed files plus 1-hop reverse callers/importers
    Balanced,
    /// Transitive reverse closure up to `max_depth` hops
    Deep { max_depth: usize },
}

/// Compute the re-index set for a change set under a policy.
pub fn expand_scope(
    changes: &ChangeSet,
    graph: &GraphDocument,
    dep_graph: &FileDependencyGraph,
    policy: ReindexPolicy,
) -> BTreeSet<FileId> {
    let seed: BTreeSet<FileId> = changes.changed().into_iter().collect();

    let max_depth = match policy {
        ReindexPolicy::Fast => 0,
        ReindexPolicy::Balanced => 1,
        ReindexPolicy::Deep { max_depth } => max_depth,
    };
    if max_depth == 0 {
        return seed;
    }

    // Deleted files have no fresh content to index, but their dependents
    // still need re-resolution.
    let mut frontier: VecDeque<(FileId, usize)> = seed
        .iter()
        .chain(changes.deleted.iter())
        .map(|f| (f.clone(), 0))
        .collect();

    let mut result = seed;
    let mut visited: BTreeSet<FileId> = frontier.iter().map(|(f, _)| f.clone()).collect();

    while let Some((file, depth)) = frontier.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for dependent in reverse_file_deps(graph, dep_graph, &file) {
            if visited.insert(dependent.clone()) {
                result.insert(dependent.clone());
                frontier.push_back((dependent, depth + 1));
            }
        }
    }

    result
}

/// Files pointing at `file` through imports, calls or inheritance.
fn reverse_file_deps(
    graph: &GraphDocument,
    dep_graph: &FileDependencyGraph,
    file: &FileId,
) -> BTreeSet<FileId> {
    let mut dependents: BTreeSet<FileId> = dep_graph.dependents_of(file).into_iter().collect();

    for node in graph.nodes.iter().filter(|n| n.file.as_ref() == Some(file)) {
        for caller in graph.called_by(&node.id) {
            if let Some(caller_file) = graph.node(caller).and_then(|n| n.file.clone()) {
                if &caller_file != file {
                    dependents.insert(caller_file);
                }
            }
        }
        for heir in graph.inherited_by(&node.id) {
            if let Some(heir_file) = graph.node(heir).and_then(|n| n.file.clone()) {
                if &heir_file != file {
                    dependents.insert(heir_file);
                }
            }
        }
        for importer in graph.imported_by(&node.id) {
            if let Some(importer_file) = graph.node(importer).and_then(|n| n.file.clone()) {
                if &importer_file != file {
                    dependents.insert(importer_file);
                }
            }
        }
    }

    dependents
}

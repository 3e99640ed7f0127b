//! Reverse adjacency index construction (second pass over sorted edges).

use std::collections::BTreeMap;

use super::domain::{GraphEdge, GraphEdgeKind, GraphIndexes, GraphNode};

/// Build the reverse indexes. Input must already be canonicalized, so the
/// produced vectors are sorted without extra work.
pub fn build_indexes(_nodes: &[GraphNode], edges: &[GraphEdge]) -> GraphIndexes {
    let mut indexes = GraphIndexes::default();

    for edge in edges {
        let bucket: Option<&mut BTreeMap<String, Vec<String>>> = match edge.kind {
            GraphEdgeKind::Calls => Some(&mut indexes.called_by),
            GraphEdgeKind::Imports => Some(&mut indexes.imported_by),
            GraphEdgeKind::Inherits | GraphEdgeKind::Implements => {
                Some(&mut indexes.inherited_by)
            }
            GraphEdgeKind::UsesType | GraphEdgeKind::HasType => Some(&mut indexes.type_users),
            GraphEdgeKind::Reads => Some(&mut indexes.reads_by),
            GraphEdgeKind::Writes => Some(&mut indexes.writes_by),
            _ => None,
        };
        if let Some(bucket) = bucket {
            bucket
                .entry(edge.target.clone())
                .or_default()
                .push(edge.source.clone());
        }
    }

    for bucket in [
        &mut indexes.called_by,
        &mut indexes.imported_by,
        &mut indexes.inherited_by,
        &mut indexes.type_users,
        &mut indexes.reads_by,
        &mut indexes.writes_by,
    ] {
        for sources in bucket.values_mut() {
            sources.sort();
            sources.dedup();
        }
    }

    indexes
}

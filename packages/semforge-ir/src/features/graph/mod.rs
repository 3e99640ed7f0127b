//! Graph materialization: typed nodes/edges, reverse indexes, file
//! dependency graph.

mod builder;
mod dep_graph;
mod domain;
mod index_builder;

pub use builder::{graph_node_id, FileInputs, GraphBuilder};
pub use dep_graph::FileDependencyGraph;
pub use domain::{
    EdgeStatus, GraphDocument, GraphEdge, GraphEdgeKind, GraphIndexes, GraphNode, GraphNodeKind,
};
pub use index_builder::build_indexes;

//! Graph materialization: structural + semantic IR → GraphDocument.
//!
//! Deterministic by construction: files are consumed in sorted order and
//! edges are added in a fixed phase order (structural → CFG → DFG →
//! type-reference), then the whole document is canonicalized and the
//! reverse indexes are derived in a second pass.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::domain::{GraphDocument, GraphEdge, GraphEdgeKind, GraphNode, GraphNodeKind};
use super::index_builder::build_indexes;
use crate::features::cache::FileId;
use crate::features::semantic::domain::{CfgEdgeKind, DfgEdgeKind, DfgOp, SemanticIR};
use crate::features::structural::StructuralIR;
use crate::shared::models::{EdgeKind, NodeKind};

/// One file's inputs to materialization.
pub struct FileInputs {
    pub structural: Arc<StructuralIR>,
    pub semantic: Option<Arc<SemanticIR>>,
}

pub struct GraphBuilder {
    repo_id: String,
}

impl GraphBuilder {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
        }
    }

    /// Build the full graph. `files` may arrive in any order; it is
    /// consumed sorted by file id.
    pub fn build(&self, files: &BTreeMap<FileId, FileInputs>) -> GraphDocument {
        let mut graph = GraphDocument::new(self.repo_id.clone());
        // Cross-file resolution tables. Per-file IR keeps external targets
        // as written; they resolve here, against the whole input set.
        let mut resolver = SymbolTable::default();

        // Phase 1: structural nodes + module synthesis.
        for (file_id, inputs) in files {
            self.add_structural_nodes(&mut graph, &mut resolver, file_id, &inputs.structural);
        }

        // Phase 2: semantic nodes (blocks, variables, expressions,
        // signatures).
        for (file_id, inputs) in files {
            if let Some(semantic) = &inputs.semantic {
                self.add_semantic_nodes(&mut graph, file_id, semantic);
            }
        }

        // Phase 3: edges, fixed order: structural → CFG → DFG → type-ref.
        for (file_id, inputs) in files {
            self.add_structural_edges(&mut graph, &resolver, file_id, &inputs.structural);
        }
        for (file_id, inputs) in files {
            if let Some(semantic) = &inputs.semantic {
                self.add_cfg_edges(&mut graph, &resolver, file_id, semantic);
            }
        }
        for (file_id, inputs) in files {
            if let Some(semantic) = &inputs.semantic {
                self.add_dfg_edges(&mut graph, file_id, semantic);
            }
        }
        for (file_id, inputs) in files {
            if let Some(semantic) = &inputs.semantic {
                self.add_type_edges(&mut graph, &resolver, file_id, semantic);
            }
        }

        // Phase 4: canonical order, then reverse indexes.
        graph.canonicalize();
        graph.indexes = build_indexes(&graph.nodes, &graph.edges);
        graph
    }

    fn add_structural_nodes(
        &self,
        graph: &mut GraphDocument,
        resolver: &mut SymbolTable,
        file_id: &FileId,
        ir: &StructuralIR,
    ) {
        // Synthesized module chain from the file path.
        let mut parent: Option<String> = None;
        let mut dotted = String::new();
        for component in file_id.parent_components() {
            if !dotted.is_empty() {
                dotted.push('.');
            }
            dotted.push_str(component);
            let id = format!("module:{dotted}");
            if !graph.nodes.iter().any(|n| n.id == id) {
                graph.nodes.push(GraphNode {
                    id: id.clone(),
                    kind: GraphNodeKind::Module,
                    name: component.to_string(),
                    fqn: dotted.clone(),
                    file: None,
                    span: None,
                });
            }
            if let Some(parent_id) = &parent {
                graph
                    .edges
                    .push(GraphEdge::new(parent_id.clone(), id.clone(), GraphEdgeKind::Contains));
            }
            parent = Some(id);
        }

        // File anchor node.
        let file_node_id = format!("file:{file_id}");
        graph.nodes.push(GraphNode {
            id: file_node_id.clone(),
            kind: GraphNodeKind::File,
            name: file_id.to_string(),
            fqn: file_id.to_string(),
            file: Some(file_id.clone()),
            span: None,
        });
        if let Some(parent_id) = parent {
            graph
                .edges
                .push(GraphEdge::new(parent_id, file_node_id.clone(), GraphEdgeKind::Contains));
        }

        for node in &ir.nodes {
            let id = graph_node_id(file_id, &node.id);
            graph.nodes.push(GraphNode {
                id: id.clone(),
                kind: node.kind.into(),
                name: node.name.clone(),
                fqn: node.fqn.clone(),
                file: Some(file_id.clone()),
                span: Some(node.span),
            });
            resolver.record(&node.fqn, &node.name, &id);
            if node.kind != NodeKind::File {
                graph
                    .edges
                    .push(GraphEdge::new(file_node_id.clone(), id, GraphEdgeKind::Contains));
            }
        }
    }

    fn add_semantic_nodes(&self, graph: &mut GraphDocument, file_id: &FileId, semantic: &SemanticIR) {
        for cfg in &semantic.cfgs {
            for block in &cfg.blocks {
                graph.nodes.push(GraphNode {
                    id: graph_node_id(file_id, &block.id),
                    kind: GraphNodeKind::CfgBlock,
                    name: block.id.clone(),
                    fqn: block.id.clone(),
                    file: Some(file_id.clone()),
                    span: Some(block.span),
                });
            }
        }
        for dfg in &semantic.dfgs {
            for variable in &dfg.variables {
                graph.nodes.push(GraphNode {
                    id: graph_node_id(file_id, &variable.id),
                    kind: GraphNodeKind::DfgVariable,
                    name: variable.name.clone(),
                    fqn: variable.id.clone(),
                    file: Some(file_id.clone()),
                    span: None,
                });
            }
        }
        for expr in &semantic.expressions {
            graph.nodes.push(GraphNode {
                id: graph_node_id(file_id, &expr.id),
                kind: GraphNodeKind::Expression,
                name: expr.kind.as_str().to_string(),
                fqn: expr.id.clone(),
                file: Some(file_id.clone()),
                span: Some(expr.span),
            });
        }
        for signature in &semantic.signatures {
            graph.nodes.push(GraphNode {
                id: graph_node_id(file_id, &format!("{}::sig", signature.function_id)),
                kind: GraphNodeKind::Signature,
                name: signature.fqn.clone(),
                fqn: format!("{}::sig", signature.fqn),
                file: Some(file_id.clone()),
                span: None,
            });
        }
    }

    fn add_structural_edges(
        &self,
        graph: &mut GraphDocument,
        resolver: &SymbolTable,
        file_id: &FileId,
        ir: &StructuralIR,
    ) {
        for edge in &ir.edges {
            let source = graph_node_id(file_id, &edge.source_id);
            let kind = structural_edge_kind(edge.kind);
            if edge.external {
                let target = resolve_external(graph, resolver, &edge.target_id);
                graph.edges.push(GraphEdge::new(source, target, kind).cross_file());
            } else {
                graph
                    .edges
                    .push(GraphEdge::new(source, graph_node_id(file_id, &edge.target_id), kind));
            }
        }
    }

    fn add_cfg_edges(
        &self,
        graph: &mut GraphDocument,
        resolver: &SymbolTable,
        file_id: &FileId,
        semantic: &SemanticIR,
    ) {
        // Call edges: file-local names resolve against the whole input
        // set here, never earlier.
        for edge in &semantic.call_edges {
            let source = graph_node_id(file_id, &edge.source_id);
            if edge.external {
                let target = resolve_external(graph, resolver, &edge.target_id);
                graph
                    .edges
                    .push(GraphEdge::new(source, target, GraphEdgeKind::Calls).cross_file());
            } else {
                graph.edges.push(GraphEdge::new(
                    source,
                    graph_node_id(file_id, &edge.target_id),
                    GraphEdgeKind::Calls,
                ));
            }
        }

        for cfg in &semantic.cfgs {
            let function = graph_node_id(file_id, &cfg.function_id);
            for block in &cfg.blocks {
                graph.edges.push(GraphEdge::new(
                    function.clone(),
                    graph_node_id(file_id, &block.id),
                    GraphEdgeKind::HasBlock,
                ));
            }
            for edge in &cfg.edges {
                graph.edges.push(GraphEdge::new(
                    graph_node_id(file_id, &edge.source),
                    graph_node_id(file_id, &edge.target),
                    flow_edge_kind(edge.kind),
                ));
            }
        }
    }

    fn add_dfg_edges(&self, graph: &mut GraphDocument, file_id: &FileId, semantic: &SemanticIR) {
        for dfg in &semantic.dfgs {
            let function = graph_node_id(file_id, &dfg.function_id);
            for variable in &dfg.variables {
                graph.edges.push(GraphEdge::new(
                    function.clone(),
                    graph_node_id(file_id, &variable.id),
                    GraphEdgeKind::HasVariable,
                ));
            }
            for event in &dfg.events {
                let block = graph_node_id(file_id, &event.block_id);
                let variable = graph_node_id(file_id, &event.variable_id);
                let kind = match event.op {
                    DfgOp::Read => GraphEdgeKind::Reads,
                    DfgOp::Write => GraphEdgeKind::Writes,
                };
                graph.edges.push(GraphEdge::new(block, variable, kind));
            }
            for edge in &dfg.edges {
                graph.edges.push(GraphEdge::new(
                    graph_node_id(file_id, &edge.from_variable),
                    graph_node_id(file_id, &edge.to_variable),
                    data_edge_kind(edge.kind),
                ));
            }
        }
    }

    fn add_type_edges(
        &self,
        graph: &mut GraphDocument,
        resolver: &SymbolTable,
        file_id: &FileId,
        semantic: &SemanticIR,
    ) {
        for signature in &semantic.signatures {
            let function = graph_node_id(file_id, &signature.function_id);
            let sig_node = graph_node_id(file_id, &format!("{}::sig", signature.function_id));
            graph
                .edges
                .push(GraphEdge::new(function, sig_node.clone(), GraphEdgeKind::HasSignature));
            if let Some(ret) = &signature.return_type {
                if let Some(target) = resolver.by_fqn(&ret.name) {
                    graph
                        .edges
                        .push(GraphEdge::new(sig_node.clone(), target.to_string(), GraphEdgeKind::HasType));
                }
            }
        }

        for expr in &semantic.expressions {
            let expr_node = graph_node_id(file_id, &expr.id);
            let function = expr.id.split("::e").next().unwrap_or("").to_string();
            if !function.is_empty() {
                graph.edges.push(GraphEdge::new(
                    graph_node_id(file_id, &function),
                    expr_node.clone(),
                    GraphEdgeKind::HasExpression,
                ));
            }
            if let Some(type_name) = &expr.inferred_type {
                if let Some(target) = resolver.by_fqn(type_name) {
                    graph
                        .edges
                        .push(GraphEdge::new(expr_node, target.to_string(), GraphEdgeKind::UsesType));
                }
            }
        }
    }
}

/// Project-wide symbol tables built in phase 1.
#[derive(Debug, Default)]
struct SymbolTable {
    /// FQN → graph node id (first definition wins, file order is sorted)
    fqns: BTreeMap<String, String>,
    /// simple name → candidate graph node ids, sorted
    names: BTreeMap<String, BTreeSet<String>>,
}

impl SymbolTable {
    fn record(&mut self, fqn: &str, name: &str, graph_id: &str) {
        self.fqns
            .entry(fqn.to_string())
            .or_insert_with(|| graph_id.to_string());
        self.names
            .entry(name.to_string())
            .or_default()
            .insert(graph_id.to_string());
    }

    fn by_fqn(&self, fqn: &str) -> Option<&str> {
        self.fqns.get(fqn).map(String::as_str)
    }

    /// Deterministic pick when only a simple name is known: smallest
    /// graph id among candidates.
    fn by_simple_name(&self, name: &str) -> Option<&str> {
        self.names
            .get(name)
            .and_then(|ids| ids.iter().next())
            .map(String::as_str)
    }
}

/// Resolve an external target reference: FQN first, then simple name,
/// else a synthesized external-symbol node.
fn resolve_external(graph: &mut GraphDocument, resolver: &SymbolTable, target: &str) -> String {
    if let Some(id) = resolver.by_fqn(target) {
        return id.to_string();
    }
    if let Some(id) = resolver.by_simple_name(target) {
        return id.to_string();
    }
    let ext = format!("ext:{target}");
    if !graph.nodes.iter().any(|n| n.id == ext) {
        graph.nodes.push(GraphNode {
            id: ext.clone(),
            kind: GraphNodeKind::ExternalSymbol,
            name: target.rsplit('.').next().unwrap_or(target).to_string(),
            fqn: target.to_string(),
            file: None,
            span: None,
        });
    }
    ext
}

/// Globally stable graph node id for a per-file node id.
pub fn graph_node_id(file_id: &FileId, node_id: &str) -> String {
    format!("{file_id}#{node_id}")
}

fn structural_edge_kind(kind: EdgeKind) -> GraphEdgeKind {
    match kind {
        EdgeKind::Contains => GraphEdgeKind::Contains,
        EdgeKind::Imports => GraphEdgeKind::Imports,
        EdgeKind::Inherits => GraphEdgeKind::Inherits,
        EdgeKind::Implements => GraphEdgeKind::Implements,
        EdgeKind::Calls => GraphEdgeKind::Calls,
        EdgeKind::References => GraphEdgeKind::References,
        EdgeKind::Reads => GraphEdgeKind::Reads,
        EdgeKind::Writes => GraphEdgeKind::Writes,
        EdgeKind::Defines => GraphEdgeKind::Defines,
        EdgeKind::Decorates => GraphEdgeKind::Decorates,
        EdgeKind::Raises => GraphEdgeKind::Raises,
        EdgeKind::Instantiates => GraphEdgeKind::Instantiates,
    }
}

fn flow_edge_kind(kind: CfgEdgeKind) -> GraphEdgeKind {
    match kind {
        CfgEdgeKind::Normal => GraphEdgeKind::FlowNormal,
        CfgEdgeKind::TrueBranch => GraphEdgeKind::FlowTrue,
        CfgEdgeKind::FalseBranch => GraphEdgeKind::FlowFalse,
        CfgEdgeKind::Exception => GraphEdgeKind::FlowException,
        CfgEdgeKind::LoopBack => GraphEdgeKind::FlowLoopBack,
        CfgEdgeKind::Break => GraphEdgeKind::FlowBreak,
        CfgEdgeKind::Continue => GraphEdgeKind::FlowContinue,
        CfgEdgeKind::Return => GraphEdgeKind::FlowReturn,
    }
}

fn data_edge_kind(kind: DfgEdgeKind) -> GraphEdgeKind {
    match kind {
        DfgEdgeKind::Alias => GraphEdgeKind::DataAlias,
        DfgEdgeKind::Assign => GraphEdgeKind::DataAssign,
        DfgEdgeKind::ParamToArg => GraphEdgeKind::DataParamToArg,
        DfgEdgeKind::Return => GraphEdgeKind::DataReturn,
    }
}

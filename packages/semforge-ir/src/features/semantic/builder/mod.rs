//! Per-file semantic build pipeline.
//!
//! Strict layer order per file: signatures → CFG → expressions → type
//! linking → DFG → SSA/dominators → PDG/interprocedural. Which layers run
//! is decided by the tier plan; a failure in any layer is reported as a
//! fault for that file and never aborts the surrounding build.

mod dataflow;
mod expressions;
mod flow;
mod project;
mod signatures;
mod ssa_build;
mod type_link;

pub use dataflow::{param_id, return_slot_id};
pub use flow::{lower_function, LoweredFunction};
pub use project::{ImportMap, ProjectContext, ProjectSymbol};
pub use signatures::{build_signatures, TypeResolver};
pub use ssa_build::{build_pdg, build_ssa, compute_dominators};
pub use type_link::TypeLinker;

use std::sync::Arc;
use thiserror::Error;

use super::domain::{DfgEdge, DfgEdgeKind, SemanticIR, SemanticTier, TierOptions};
use crate::features::structural::StructuralIR;
use crate::shared::models::{Edge, EdgeKind};
use crate::shared::ports::TypeInferencePort;

#[derive(Error, Debug, Clone)]
#[error("semantic build failed at {stage} for {file}: {reason}")]
pub struct SemanticBuildError {
    pub file: String,
    pub stage: &'static str,
    pub reason: String,
}

/// Builds semantic IR for single files against a shared project context.
pub struct SemanticBuilder<'a> {
    project: &'a ProjectContext,
    types: &'a dyn TypeInferencePort,
    tier: SemanticTier,
    options: TierOptions,
}

impl<'a> SemanticBuilder<'a> {
    pub fn new(
        project: &'a ProjectContext,
        types: &'a dyn TypeInferencePort,
        tier: SemanticTier,
        options: TierOptions,
    ) -> Self {
        Self {
            project,
            types,
            tier,
            options,
        }
    }

    /// Build the semantic IR for one file.
    pub fn build_file(&self, ir: &StructuralIR) -> Result<SemanticIR, SemanticBuildError> {
        let mut semantic = SemanticIR::empty(ir.file_id.clone(), self.tier);

        // 1. Signatures (always). Deep type resolution at EXTENDED+.
        let resolve_types = self.tier >= SemanticTier::Extended;
        semantic.signatures = build_signatures(ir, self.project, resolve_types);

        // Call graph edges straight from the structural layer (BASE set).
        semantic.call_edges = ir
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Calls)
            .cloned()
            .collect();

        for node in ir.callables() {
            let Some(attrs) = node.function_attrs() else {
                continue;
            };

            // 2. BFG → CFG.
            let lowered = lower_function(&node.id, attrs, node.span);
            // Call edges from statement hints, kept file-local.
            for (_, stmt) in &lowered.placements {
                if let Some(callee) = stmt.hint.callee() {
                    semantic.call_edges.push(self.call_edge(ir, &node.id, callee));
                }
            }
            if self.options.cfg {
                semantic.cfgs.push(lowered.cfg.clone());
            }

            // 3+4. Expression IR with batched inference, then type links.
            if self.options.expressions {
                let mut exprs =
                    expressions::extract_expressions(&node.id, attrs, &lowered);
                expressions::infer_types(&mut exprs, &node.fqn, self.types);
                TypeLinker::new(self.project, &ir.file_id).link(&mut exprs);
                semantic.expressions.extend(exprs);
            }

            // 5. DFG, subject to the LOC threshold.
            let dfg = if self.options.dfg {
                dataflow::build_dfg(
                    &node.id,
                    attrs,
                    node.loc(),
                    &lowered,
                    self.options.dfg_function_loc_threshold,
                )
            } else {
                None
            };

            // 6. SSA + dominators.
            if self.options.ssa {
                let dom = compute_dominators(&lowered.cfg, false);
                if let Some(dfg) = &dfg {
                    semantic.ssa.push(build_ssa(&lowered.cfg, dfg, &dom));
                    // 7. PDG.
                    semantic.pdgs.push(build_pdg(&lowered.cfg, dfg));
                }
                semantic.dominators.push(dom);
            }

            if let Some(dfg) = dfg {
                semantic.dfgs.push(dfg);
            }
        }

        // 7b. Interprocedural DFG: argument-to-parameter edges across the
        // call graph (FULL only).
        if self.options.interprocedural {
            self.link_interprocedural(ir, &mut semantic);
        }

        semantic.normalize();
        Ok(semantic)
    }

    /// Call edges stay file-local in cached semantic IR: an in-file
    /// callee becomes an internal edge, everything else is tagged
    /// external with the name as written. Cross-file resolution happens
    /// at graph materialization, so a cached entry never bakes in
    /// another file's state.
    fn call_edge(&self, ir: &StructuralIR, caller_id: &str, callee: &str) -> Edge {
        if let Some(node) = ir.nodes.iter().find(|n| n.kind.is_callable() && n.name == callee) {
            return Edge::new(caller_id, node.id.clone(), EdgeKind::Calls);
        }
        Edge::external(caller_id, callee, EdgeKind::Calls)
    }

    /// Connect call-site argument reads to callee parameters. Limited to
    /// in-file callees: cached IR must not embed another file's node ids.
    fn link_interprocedural(&self, ir: &StructuralIR, semantic: &mut SemanticIR) {
        let mut extra: Vec<(String, DfgEdge)> = Vec::new();

        for node in ir.callables() {
            let Some(attrs) = node.function_attrs() else {
                continue;
            };
            for stmt in flatten(&attrs.body) {
                let Some(callee) = stmt.hint.callee() else {
                    continue;
                };
                let Some(callee_node) = ir
                    .nodes
                    .iter()
                    .find(|n| n.kind.is_callable() && n.name == callee)
                else {
                    continue;
                };
                let Some(params) = callee_node.function_attrs().map(|a| &a.params) else {
                    continue;
                };

                for (arg, param) in stmt.hint.reads().iter().zip(params.iter()) {
                    extra.push((
                        node.id.clone(),
                        DfgEdge::new(
                            param_id(&node.id, arg),
                            param_id(&callee_node.id, &param.name),
                            DfgEdgeKind::ParamToArg,
                        ),
                    ));
                }
            }
        }

        for (function_id, edge) in extra {
            if let Some(dfg) = semantic
                .dfgs
                .iter_mut()
                .find(|d| d.function_id == function_id)
            {
                dfg.edges.push(edge);
                dfg.normalize();
            }
        }
    }
}

/// Flatten nested statement hints depth-first.
fn flatten(stmts: &[crate::shared::models::Stmt]) -> Vec<&crate::shared::models::Stmt> {
    use crate::shared::models::StmtHint;
    let mut out = Vec::new();
    for stmt in stmts {
        out.push(stmt);
        match &stmt.hint {
            StmtHint::If {
                then_body,
                else_body,
                ..
            } => {
                out.extend(flatten(then_body));
                out.extend(flatten(else_body));
            }
            StmtHint::While { body, .. } | StmtHint::For { body, .. } => {
                out.extend(flatten(body));
            }
            StmtHint::Try {
                body,
                handlers,
                finally,
            } => {
                out.extend(flatten(body));
                for h in handlers {
                    out.extend(flatten(&h.body));
                }
                out.extend(flatten(finally));
            }
            _ => {}
        }
    }
    out
}

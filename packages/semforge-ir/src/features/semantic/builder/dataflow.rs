//! Function-local DFG construction.
//!
//! Walks the statement placements produced by CFG lowering and emits
//! variables, read/write events and edges. Functions above the configured
//! LOC threshold are skipped entirely.

use std::collections::BTreeSet;

use super::flow::LoweredFunction;
use crate::features::semantic::domain::{
    DataFlowGraph, DfgEdge, DfgEdgeKind, DfgEvent, DfgOp, DfgVariable, DfgVariableKind,
};
use crate::shared::models::{FunctionAttrs, StmtHint};

/// Synthetic variable name for the function's return value.
const RETURN_SLOT: &str = "<ret>";

fn var_id(function_id: &str, name: &str) -> String {
    format!("{function_id}::{name}")
}

/// Build the DFG for one lowered function. Returns `None` when the
/// function exceeds the LOC threshold (`0` skips everything,
/// `u32::MAX` skips nothing).
pub fn build_dfg(
    function_id: &str,
    attrs: &FunctionAttrs,
    loc: u32,
    lowered: &LoweredFunction,
    loc_threshold: u32,
) -> Option<DataFlowGraph> {
    if loc > loc_threshold {
        tracing::debug!(function_id, loc, loc_threshold, "DFG skipped by LOC threshold");
        return None;
    }

    // Pass 1: classify names. Written names are locals, parameters are
    // params, read-only names are captured from an enclosing scope.
    let param_names: BTreeSet<&str> = attrs.params.iter().map(|p| p.name.as_str()).collect();
    let mut written: BTreeSet<&str> = BTreeSet::new();
    for (_, stmt) in &lowered.placements {
        if let Some(target) = stmt.hint.write_target() {
            written.insert(target);
        }
    }

    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(param_names.iter().copied());
    names.extend(written.iter().copied());
    for (_, stmt) in &lowered.placements {
        for read in stmt.hint.reads() {
            names.insert(read.as_str());
        }
    }

    let mut variables: Vec<DfgVariable> = names
        .iter()
        .map(|name| {
            let kind = if param_names.contains(name) {
                DfgVariableKind::Param
            } else if written.contains(name) {
                DfgVariableKind::Local
            } else {
                DfgVariableKind::Captured
            };
            let annotation = attrs
                .params
                .iter()
                .find(|p| p.name == *name)
                .and_then(|p| p.annotation.clone());
            DfgVariable {
                id: var_id(function_id, name),
                name: name.to_string(),
                kind,
                scope: function_id.to_string(),
                type_name: annotation,
            }
        })
        .collect();

    let mut events: Vec<DfgEvent> = Vec::new();
    let mut edges: Vec<DfgEdge> = Vec::new();
    let mut has_return = false;

    // Parameters are defined on entry.
    let entry = lowered.cfg.entry.clone();
    for p in &attrs.params {
        events.push(DfgEvent {
            variable_id: var_id(function_id, &p.name),
            block_id: entry.clone(),
            op: DfgOp::Write,
            span: lowered.cfg.block(&entry).map(|b| b.span).unwrap_or_default(),
        });
    }

    // Pass 2: events and intra-function edges.
    for (block_id, stmt) in &lowered.placements {
        for read in stmt.hint.reads() {
            events.push(DfgEvent {
                variable_id: var_id(function_id, read),
                block_id: block_id.clone(),
                op: DfgOp::Read,
                span: stmt.span,
            });
        }
        // AugAssign reads its own target.
        if let StmtHint::AugAssign { target, .. } = &stmt.hint {
            events.push(DfgEvent {
                variable_id: var_id(function_id, target),
                block_id: block_id.clone(),
                op: DfgOp::Read,
                span: stmt.span,
            });
        }
        if let Some(target) = stmt.hint.write_target() {
            events.push(DfgEvent {
                variable_id: var_id(function_id, target),
                block_id: block_id.clone(),
                op: DfgOp::Write,
                span: stmt.span,
            });
        }

        match &stmt.hint {
            StmtHint::Assign { target, reads, call } => {
                // Pure rename (`x = y`) is an alias, everything else an
                // assignment flow.
                let kind = if call.is_none() && reads.len() == 1 {
                    DfgEdgeKind::Alias
                } else {
                    DfgEdgeKind::Assign
                };
                for read in reads {
                    edges.push(DfgEdge::new(
                        var_id(function_id, read),
                        var_id(function_id, target),
                        kind,
                    ));
                }
            }
            StmtHint::AugAssign { target, reads } => {
                for read in reads {
                    edges.push(DfgEdge::new(
                        var_id(function_id, read),
                        var_id(function_id, target),
                        DfgEdgeKind::Assign,
                    ));
                }
            }
            StmtHint::For { target, iter_reads, .. } => {
                for read in iter_reads {
                    edges.push(DfgEdge::new(
                        var_id(function_id, read),
                        var_id(function_id, target),
                        DfgEdgeKind::Assign,
                    ));
                }
            }
            StmtHint::Return { reads } => {
                has_return = true;
                for read in reads {
                    edges.push(DfgEdge::new(
                        var_id(function_id, read),
                        var_id(function_id, RETURN_SLOT),
                        DfgEdgeKind::Return,
                    ));
                }
            }
            _ => {}
        }
    }

    if has_return {
        variables.push(DfgVariable {
            id: var_id(function_id, RETURN_SLOT),
            name: RETURN_SLOT.to_string(),
            kind: DfgVariableKind::Local,
            scope: function_id.to_string(),
            type_name: attrs.return_annotation.clone(),
        });
    }

    let mut dfg = DataFlowGraph {
        function_id: function_id.to_string(),
        variables,
        events,
        edges,
    };
    dfg.normalize();
    Some(dfg)
}

/// Return-slot variable id for a function (used by interprocedural
/// linking).
pub fn return_slot_id(function_id: &str) -> String {
    var_id(function_id, RETURN_SLOT)
}

/// Parameter variable id for a function.
pub fn param_id(function_id: &str, param: &str) -> String {
    var_id(function_id, param)
}

//! Expression IR extraction with batched type inference.
//!
//! One expression per statement occurrence. Inference requests for the
//! whole file are gathered into a single batch against the external type
//! service; annotation-derived types short-circuit the query.

use std::collections::HashMap;

use super::flow::LoweredFunction;
use crate::features::semantic::domain::{ExprKind, Expression};
use crate::shared::models::{FunctionAttrs, StmtHint};
use crate::shared::ports::{TypeInferencePort, TypeQuery};

/// Extract expressions for one function, in placement order.
pub fn extract_expressions(
    function_id: &str,
    attrs: &FunctionAttrs,
    lowered: &LoweredFunction,
) -> Vec<Expression> {
    let mut expressions = Vec::new();
    let mut counter = 0u32;
    let mut next_id = || {
        let id = format!("{function_id}::e{counter}");
        counter += 1;
        id
    };

    for (_, stmt) in &lowered.placements {
        let expr = match &stmt.hint {
            StmtHint::Assign { target, reads, call } => {
                let kind = if call.is_some() {
                    ExprKind::Call
                } else {
                    ExprKind::Assign
                };
                let mut e = Expression::new(next_id(), kind, stmt.span)
                    .with_reads(reads.clone())
                    .with_defines(target.clone());
                if let Some(callee) = call {
                    e = e.with_callee(callee.clone());
                }
                // Annotated parameters propagate their annotation through
                // trivial aliases; everything else awaits inference.
                if call.is_none() && reads.len() == 1 {
                    if let Some(p) = attrs.params.iter().find(|p| p.name == reads[0]) {
                        e.inferred_type = p.annotation.clone();
                    }
                }
                e
            }
            StmtHint::AugAssign { target, reads } => Expression::new(next_id(), ExprKind::AugAssign, stmt.span)
                .with_reads(reads.clone())
                .with_defines(target.clone()),
            StmtHint::Expr { reads, call } => {
                let kind = if call.is_some() {
                    ExprKind::Call
                } else {
                    ExprKind::Name
                };
                let mut e = Expression::new(next_id(), kind, stmt.span).with_reads(reads.clone());
                if let Some(callee) = call {
                    e = e.with_callee(callee.clone());
                }
                e
            }
            StmtHint::Return { reads } => Expression::new(next_id(), ExprKind::Return, stmt.span)
                .with_reads(reads.clone()),
            StmtHint::If { cond_reads, .. } | StmtHint::While { cond_reads, .. } => {
                Expression::new(next_id(), ExprKind::Compare, stmt.span)
                    .with_reads(cond_reads.clone())
            }
            StmtHint::For { target, iter_reads, .. } => {
                Expression::new(next_id(), ExprKind::Iter, stmt.span)
                    .with_reads(iter_reads.clone())
                    .with_defines(target.clone())
            }
            StmtHint::Raise { exception } => {
                let mut e = Expression::new(next_id(), ExprKind::Raise, stmt.span);
                if let Some(exc) = exception {
                    e = e.with_callee(exc.clone());
                }
                e
            }
            StmtHint::Try { .. } | StmtHint::Break | StmtHint::Continue | StmtHint::Pass => continue,
        };
        expressions.push(expr);
    }

    expressions
}

/// Run one batched inference pass over every expression still missing a
/// type. Mutates `inferred_type` in place.
pub fn infer_types(
    expressions: &mut [Expression],
    context_fqn: &str,
    types: &dyn TypeInferencePort,
) {
    let queries: Vec<TypeQuery> = expressions
        .iter()
        .filter(|e| e.inferred_type.is_none())
        .map(|e| TypeQuery {
            expr_id: e.id.clone(),
            text: e.render(),
            context_fqn: context_fqn.to_string(),
        })
        .collect();
    if queries.is_empty() {
        return;
    }

    let answers: HashMap<String, Option<String>> = types
        .infer_batch(&queries)
        .into_iter()
        .map(|a| (a.expr_id, a.inferred))
        .collect();

    for expr in expressions.iter_mut() {
        if expr.inferred_type.is_none() {
            if let Some(Some(inferred)) = answers.get(&expr.id) {
                expr.inferred_type = Some(inferred.clone());
            }
        }
    }
}

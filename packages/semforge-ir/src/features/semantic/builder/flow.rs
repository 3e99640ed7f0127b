//! BFG → CFG lowering from statement hints.
//!
//! Basic-flow blocks are carved out first (straight-line runs, branch
//! points, loop heads, handlers), then control edges are attached: normal,
//! true/false branch, exception, loop-back, break/continue/return.
//!
//! Besides the CFG itself the lowering records where every statement
//! landed, which the data-flow layer consumes for read/write events.

use crate::features::semantic::domain::{
    CfgBlock, CfgBlockKind, CfgEdge, CfgEdgeKind, ControlFlowGraph,
};
use crate::shared::models::{FunctionAttrs, Span, Stmt, StmtHint};

/// CFG plus statement placement, per function.
#[derive(Debug, Clone)]
pub struct LoweredFunction {
    pub cfg: ControlFlowGraph,
    /// (block id, statement) in lowering order
    pub placements: Vec<(String, Stmt)>,
}

struct LoopFrame {
    head: String,
    after: String,
}

struct Lowering {
    function_id: String,
    blocks: Vec<CfgBlock>,
    edges: Vec<CfgEdge>,
    placements: Vec<(String, Stmt)>,
    loop_stack: Vec<LoopFrame>,
    handler_stack: Vec<String>,
    exit: String,
    counter: u32,
}

impl Lowering {
    fn new(function_id: &str) -> Self {
        let mut lowering = Self {
            function_id: function_id.to_string(),
            blocks: Vec::new(),
            edges: Vec::new(),
            placements: Vec::new(),
            loop_stack: Vec::new(),
            handler_stack: Vec::new(),
            exit: String::new(),
            counter: 0,
        };
        lowering.exit = lowering.new_block(CfgBlockKind::Exit, Span::zero());
        lowering
    }

    fn new_block(&mut self, kind: CfgBlockKind, span: Span) -> String {
        let id = format!("{}::b{}", self.function_id, self.counter);
        self.counter += 1;
        self.blocks.push(CfgBlock {
            id: id.clone(),
            kind,
            span,
            statements: Vec::new(),
        });
        id
    }

    fn edge(&mut self, source: &str, target: &str, kind: CfgEdgeKind) {
        self.edges.push(CfgEdge::new(source, target, kind));
    }

    fn place(&mut self, block: &str, stmt: &Stmt) {
        let rendered = format!("{}:{}", stmt.hint.tag(), stmt.span.start_line);
        if let Some(b) = self.blocks.iter_mut().find(|b| b.id == block) {
            b.statements.push(rendered);
            if b.span == Span::zero() {
                b.span = stmt.span;
            } else {
                b.span.start_line = b.span.start_line.min(stmt.span.start_line);
                b.span.end_line = b.span.end_line.max(stmt.span.end_line);
            }
        }
        self.placements.push((block.to_string(), stmt.clone()));
    }

    /// Raises route to the innermost handler, or the exit block.
    fn exception_target(&self) -> String {
        self.handler_stack
            .last()
            .cloned()
            .unwrap_or_else(|| self.exit.clone())
    }

    /// Lower a statement sequence into `current`; returns the open block
    /// after the sequence, or `None` when control diverged.
    fn lower(&mut self, stmts: &[Stmt], mut current: String) -> Option<String> {
        let mut diverged = false;
        for stmt in stmts {
            if diverged {
                // Unreachable tail still gets a block so nothing is lost.
                current = self.new_block(CfgBlockKind::Body, stmt.span);
                diverged = false;
            }
            match &stmt.hint {
                StmtHint::Assign { .. }
                | StmtHint::AugAssign { .. }
                | StmtHint::Expr { .. }
                | StmtHint::Pass => {
                    self.place(&current, stmt);
                }
                StmtHint::Return { .. } => {
                    self.place(&current, stmt);
                    let exit = self.exit.clone();
                    self.edge(&current, &exit, CfgEdgeKind::Return);
                    diverged = true;
                }
                StmtHint::Raise { .. } => {
                    self.place(&current, stmt);
                    let target = self.exception_target();
                    self.edge(&current, &target, CfgEdgeKind::Exception);
                    diverged = true;
                }
                StmtHint::Break => {
                    self.place(&current, stmt);
                    if let Some(frame) = self.loop_stack.last() {
                        let after = frame.after.clone();
                        self.edge(&current, &after, CfgEdgeKind::Break);
                    }
                    diverged = true;
                }
                StmtHint::Continue => {
                    self.place(&current, stmt);
                    if let Some(frame) = self.loop_stack.last() {
                        let head = frame.head.clone();
                        self.edge(&current, &head, CfgEdgeKind::Continue);
                    }
                    diverged = true;
                }
                StmtHint::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    let branch = self.new_block(CfgBlockKind::Branch, stmt.span);
                    self.edge(&current, &branch, CfgEdgeKind::Normal);
                    self.place(&branch, stmt);

                    let join = self.new_block(CfgBlockKind::Body, Span::zero());

                    let then_entry = self.new_block(CfgBlockKind::Body, Span::zero());
                    self.edge(&branch, &then_entry, CfgEdgeKind::TrueBranch);
                    if let Some(end) = self.lower(then_body, then_entry) {
                        self.edge(&end, &join, CfgEdgeKind::Normal);
                    }

                    if else_body.is_empty() {
                        self.edge(&branch, &join, CfgEdgeKind::FalseBranch);
                    } else {
                        let else_entry = self.new_block(CfgBlockKind::Body, Span::zero());
                        self.edge(&branch, &else_entry, CfgEdgeKind::FalseBranch);
                        if let Some(end) = self.lower(else_body, else_entry) {
                            self.edge(&end, &join, CfgEdgeKind::Normal);
                        }
                    }
                    current = join;
                }
                StmtHint::While { body, .. } | StmtHint::For { body, .. } => {
                    let head = self.new_block(CfgBlockKind::LoopHead, stmt.span);
                    self.edge(&current, &head, CfgEdgeKind::Normal);
                    self.place(&head, stmt);

                    let after = self.new_block(CfgBlockKind::Body, Span::zero());
                    self.edge(&head, &after, CfgEdgeKind::FalseBranch);

                    let body_entry = self.new_block(CfgBlockKind::Body, Span::zero());
                    self.edge(&head, &body_entry, CfgEdgeKind::TrueBranch);

                    self.loop_stack.push(LoopFrame {
                        head: head.clone(),
                        after: after.clone(),
                    });
                    if let Some(end) = self.lower(body, body_entry) {
                        self.edge(&end, &head, CfgEdgeKind::LoopBack);
                    }
                    self.loop_stack.pop();

                    current = after;
                }
                StmtHint::Try {
                    body,
                    handlers,
                    finally,
                } => {
                    let join = if finally.is_empty() {
                        self.new_block(CfgBlockKind::Body, Span::zero())
                    } else {
                        self.new_block(CfgBlockKind::FinallyBlock, Span::zero())
                    };

                    let handler_entries: Vec<String> = handlers
                        .iter()
                        .map(|_| self.new_block(CfgBlockKind::Handler, Span::zero()))
                        .collect();

                    let body_entry = self.new_block(CfgBlockKind::Body, stmt.span);
                    self.edge(&current, &body_entry, CfgEdgeKind::Normal);
                    // Any statement in the protected region may raise into
                    // the first handler.
                    if let Some(first) = handler_entries.first() {
                        self.edge(&body_entry, first, CfgEdgeKind::Exception);
                        self.handler_stack.push(first.clone());
                    }
                    let body_end = self.lower(body, body_entry);
                    if handler_entries.first().is_some() {
                        self.handler_stack.pop();
                    }
                    if let Some(end) = body_end {
                        self.edge(&end, &join, CfgEdgeKind::Normal);
                    }

                    for (handler, entry) in handlers.iter().zip(&handler_entries) {
                        if let Some(end) = self.lower(&handler.body, entry.clone()) {
                            self.edge(&end, &join, CfgEdgeKind::Normal);
                        }
                    }

                    if finally.is_empty() {
                        current = join;
                    } else {
                        current = self
                            .lower(finally, join)
                            .unwrap_or_else(|| self.new_block(CfgBlockKind::Body, Span::zero()));
                    }
                }
            }
        }
        if diverged {
            None
        } else {
            Some(current)
        }
    }

    fn finish(mut self, entry: String, last: Option<String>) -> ControlFlowGraph {
        if let Some(last) = last {
            let exit = self.exit.clone();
            self.edge(&last, &exit, CfgEdgeKind::Normal);
        }
        let mut cfg = ControlFlowGraph {
            function_id: self.function_id,
            entry,
            exit: self.exit,
            blocks: self.blocks,
            edges: self.edges,
        };
        cfg.normalize();
        cfg
    }
}

/// Lower one function's statement hints to a CFG.
pub fn lower_function(function_id: &str, attrs: &FunctionAttrs, span: Span) -> LoweredFunction {
    let mut lowering = Lowering::new(function_id);
    let entry = lowering.new_block(CfgBlockKind::Entry, span);
    let first = lowering.new_block(CfgBlockKind::Body, Span::zero());
    lowering.edge(&entry, &first, CfgEdgeKind::Normal);
    let last = lowering.lower(&attrs.body, first);

    let placements = lowering.placements.clone();
    let cfg = lowering.finish(entry, last);
    LoweredFunction { cfg, placements }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(line: u32, hint: StmtHint) -> Stmt {
        Stmt::new(Span::new(line, 0, line, 0), hint)
    }

    fn assign(line: u32, target: &str, reads: &[&str]) -> Stmt {
        stmt(
            line,
            StmtHint::Assign {
                target: target.into(),
                reads: reads.iter().map(|s| s.to_string()).collect(),
                call: None,
            },
        )
    }

    fn lower(body: Vec<Stmt>) -> LoweredFunction {
        let attrs = FunctionAttrs {
            body,
            ..Default::default()
        };
        lower_function("f", &attrs, Span::new(1, 0, 50, 0))
    }

    #[test]
    fn test_straight_line() {
        let lowered = lower(vec![assign(1, "x", &[]), assign(2, "y", &["x"])]);
        let cfg = &lowered.cfg;
        // entry, body, exit
        assert_eq!(cfg.blocks.len(), 3);
        assert!(cfg.edges.iter().any(|e| e.kind == CfgEdgeKind::Normal));
        // Both statements in the same body block.
        assert_eq!(lowered.placements[0].0, lowered.placements[1].0);
    }

    #[test]
    fn test_if_branches() {
        let lowered = lower(vec![stmt(
            1,
            StmtHint::If {
                cond_reads: vec!["x".into()],
                then_body: vec![assign(2, "y", &["x"])],
                else_body: vec![assign(4, "y", &[])],
            },
        )]);
        let kinds: Vec<CfgEdgeKind> = lowered.cfg.edges.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&CfgEdgeKind::TrueBranch));
        assert!(kinds.contains(&CfgEdgeKind::FalseBranch));
    }

    #[test]
    fn test_while_loop_back_and_break() {
        let lowered = lower(vec![stmt(
            1,
            StmtHint::While {
                cond_reads: vec!["x".into()],
                body: vec![
                    assign(2, "x", &["x"]),
                    stmt(
                        3,
                        StmtHint::If {
                            cond_reads: vec!["x".into()],
                            then_body: vec![stmt(4, StmtHint::Break)],
                            else_body: vec![],
                        },
                    ),
                ],
            },
        )]);
        let kinds: Vec<CfgEdgeKind> = lowered.cfg.edges.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&CfgEdgeKind::LoopBack));
        assert!(kinds.contains(&CfgEdgeKind::Break));
        let heads = lowered
            .cfg
            .blocks
            .iter()
            .filter(|b| b.kind == CfgBlockKind::LoopHead)
            .count();
        assert_eq!(heads, 1);
    }

    #[test]
    fn test_return_edge() {
        let lowered = lower(vec![stmt(
            1,
            StmtHint::Return {
                reads: vec!["x".into()],
            },
        )]);
        let cfg = &lowered.cfg;
        assert!(cfg
            .edges
            .iter()
            .any(|e| e.kind == CfgEdgeKind::Return && e.target == cfg.exit));
    }

    #[test]
    fn test_try_exception_edges() {
        let lowered = lower(vec![stmt(
            1,
            StmtHint::Try {
                body: vec![stmt(
                    2,
                    StmtHint::Raise {
                        exception: Some("ValueError".into()),
                    },
                )],
                handlers: vec![crate::shared::models::Handler {
                    exception: Some("ValueError".into()),
                    body: vec![assign(4, "x", &[])],
                }],
                finally: vec![assign(6, "z", &[])],
            },
        )]);
        let kinds: Vec<CfgEdgeKind> = lowered.cfg.edges.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&CfgEdgeKind::Exception));
        assert!(lowered
            .cfg
            .blocks
            .iter()
            .any(|b| b.kind == CfgBlockKind::Handler));
        assert!(lowered
            .cfg
            .blocks
            .iter()
            .any(|b| b.kind == CfgBlockKind::FinallyBlock));
    }

    #[test]
    fn test_lowering_is_deterministic() {
        let body = || {
            vec![
                assign(1, "x", &[]),
                stmt(
                    2,
                    StmtHint::While {
                        cond_reads: vec!["x".into()],
                        body: vec![assign(3, "x", &["x"])],
                    },
                ),
                stmt(5, StmtHint::Return { reads: vec!["x".into()] }),
            ]
        };
        let a = lower(body());
        let b = lower(body());
        assert_eq!(a.cfg, b.cfg);
    }
}

//! Dominator tree, SSA renaming and PDG construction (FULL tier).
//!
//! Dominators use the iterative Cooper-Harvey-Kennedy scheme over reverse
//! postorder. Phi placement follows dominance frontiers; renaming walks
//! the dominator tree with per-variable version stacks. The PDG combines
//! control dependence (via postdominance) with def-use data dependence
//! from the DFG.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::features::semantic::domain::{
    CfgEdgeKind, ControlFlowGraph, DataFlowGraph, DfgOp, DominatorTree, PdgEdgeKind, PhiNode,
    ProgramDependenceGraph, SsaForm, SsaVariable,
};

/// Adjacency view over a CFG, optionally reversed (for postdominators).
struct FlowView<'a> {
    cfg: &'a ControlFlowGraph,
    reversed: bool,
}

impl<'a> FlowView<'a> {
    fn entry(&self) -> &str {
        if self.reversed {
            &self.cfg.exit
        } else {
            &self.cfg.entry
        }
    }

    fn successors(&self, id: &str) -> Vec<&str> {
        if self.reversed {
            self.cfg.predecessors(id)
        } else {
            self.cfg.successors(id)
        }
    }

    fn predecessors(&self, id: &str) -> Vec<&str> {
        if self.reversed {
            self.cfg.successors(id)
        } else {
            self.cfg.predecessors(id)
        }
    }
}

/// Reverse postorder over reachable blocks.
fn reverse_postorder(view: &FlowView) -> Vec<String> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut postorder: Vec<String> = Vec::new();

    // Iterative DFS with an explicit stack; successor order is the sorted
    // edge order from the normalized CFG, so traversal is deterministic.
    let mut stack: Vec<(String, usize)> = vec![(view.entry().to_string(), 0)];
    visited.insert(view.entry().to_string());
    while let Some((block, idx)) = stack.pop() {
        let succs = view.successors(&block);
        if idx < succs.len() {
            let next = succs[idx].to_string();
            stack.push((block, idx + 1));
            if visited.insert(next.clone()) {
                stack.push((next, 0));
            }
        } else {
            postorder.push(block);
        }
    }

    postorder.reverse();
    postorder
}

/// Compute (post)dominators for a CFG.
pub fn compute_dominators(cfg: &ControlFlowGraph, reversed: bool) -> DominatorTree {
    let view = FlowView { cfg, reversed };
    let order = reverse_postorder(&view);
    let index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let entry = view.entry().to_string();
    let mut idom: HashMap<String, String> = HashMap::new();
    idom.insert(entry.clone(), entry.clone());

    fn intersect<'a>(
        idom: &'a HashMap<String, String>,
        index: &HashMap<&str, usize>,
        mut a: &'a str,
        mut b: &'a str,
    ) -> String {
        while a != b {
            while index[a] > index[b] {
                a = idom[a].as_str();
            }
            while index[b] > index[a] {
                b = idom[b].as_str();
            }
        }
        a.to_string()
    }

    let mut changed = true;
    while changed {
        changed = false;
        for block in order.iter().skip(1) {
            let preds: Vec<&str> = view
                .predecessors(block)
                .into_iter()
                .filter(|p| index.contains_key(p))
                .collect();
            let mut new_idom: Option<String> = None;
            for pred in &preds {
                if idom.contains_key(*pred) {
                    new_idom = Some(match new_idom {
                        None => pred.to_string(),
                        Some(current) => intersect(&idom, &index, pred, &current),
                    });
                }
            }
            if let Some(new_idom) = new_idom {
                if idom.get(block) != Some(&new_idom) {
                    idom.insert(block.clone(), new_idom);
                    changed = true;
                }
            }
        }
    }

    // Dominance frontiers.
    let mut frontier: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for block in &order {
        let preds: Vec<&str> = view
            .predecessors(block)
            .into_iter()
            .filter(|p| idom.contains_key(*p))
            .collect();
        if preds.len() < 2 {
            continue;
        }
        let Some(target_idom) = idom.get(block) else {
            continue;
        };
        for pred in preds {
            let mut runner = pred.to_string();
            while &runner != target_idom {
                frontier
                    .entry(runner.clone())
                    .or_default()
                    .insert(block.clone());
                match idom.get(&runner) {
                    Some(parent) if *parent != runner => runner = parent.clone(),
                    _ => break,
                }
            }
        }
    }

    DominatorTree {
        function_id: cfg.function_id.clone(),
        idom: idom.into_iter().collect(),
        frontier: frontier
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect(),
    }
}

/// Build SSA form: phi placement over the dominance frontier, then
/// renaming down the dominator tree.
pub fn build_ssa(cfg: &ControlFlowGraph, dfg: &DataFlowGraph, dom: &DominatorTree) -> SsaForm {
    // Definition blocks per variable name.
    let mut def_blocks: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for event in &dfg.events {
        if event.op == DfgOp::Write {
            if let Some(var) = dfg.variable(&event.variable_id) {
                def_blocks
                    .entry(var.name.clone())
                    .or_default()
                    .insert(event.block_id.clone());
            }
        }
    }

    // Phi placement (worklist over dominance frontiers).
    let mut phi_blocks: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, defs) in &def_blocks {
        let mut work: Vec<String> = defs.iter().cloned().collect();
        let mut placed: BTreeSet<String> = BTreeSet::new();
        while let Some(block) = work.pop() {
            if let Some(frontier) = dom.frontier.get(&block) {
                for f in frontier {
                    if placed.insert(f.clone()) {
                        phi_blocks.entry(name.clone()).or_default().insert(f.clone());
                        if !def_blocks[name].contains(f) {
                            work.push(f.clone());
                        }
                    }
                }
            }
        }
    }

    // Children in the dominator tree, sorted for determinism.
    let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (block, parent) in &dom.idom {
        if block != parent {
            children.entry(parent.clone()).or_default().push(block.clone());
        }
    }
    for kids in children.values_mut() {
        kids.sort();
    }

    // Events grouped per block, in normalized order.
    let mut block_events: BTreeMap<&str, Vec<(&str, DfgOp)>> = BTreeMap::new();
    for event in &dfg.events {
        if let Some(var) = dfg.variable(&event.variable_id) {
            block_events
                .entry(event.block_id.as_str())
                .or_default()
                .push((var.name.as_str(), event.op));
        }
    }

    let mut versions: BTreeMap<String, u32> = BTreeMap::new();
    let mut stacks: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    let mut variables: Vec<SsaVariable> = Vec::new();

    // Phi nodes exist before renaming: predecessors may be visited ahead
    // of their join block and must find the phi to fill its args.
    let mut phis: BTreeMap<(String, String), PhiNode> = BTreeMap::new();
    for (name, blocks) in &phi_blocks {
        for block in blocks {
            phis.insert(
                (block.clone(), name.clone()),
                PhiNode {
                    block_id: block.clone(),
                    variable: name.clone(),
                    version: 0,
                    args: Vec::new(),
                },
            );
        }
    }

    struct Renamer<'a> {
        children: &'a BTreeMap<String, Vec<String>>,
        block_events: &'a BTreeMap<&'a str, Vec<(&'a str, DfgOp)>>,
        phi_blocks: &'a BTreeMap<String, BTreeSet<String>>,
        cfg: &'a ControlFlowGraph,
    }

    impl Renamer<'_> {
        #[allow(clippy::too_many_arguments)]
        fn visit(
            &self,
            block: &str,
            versions: &mut BTreeMap<String, u32>,
            stacks: &mut BTreeMap<String, Vec<u32>>,
            variables: &mut Vec<SsaVariable>,
            phis: &mut BTreeMap<(String, String), PhiNode>,
        ) {
            let mut pushed: Vec<String> = Vec::new();

            // Phi definitions first.
            for (name, blocks) in self.phi_blocks {
                if blocks.contains(block) {
                    let version = bump(versions, name);
                    stacks.entry(name.clone()).or_default().push(version);
                    pushed.push(name.clone());
                    variables.push(SsaVariable {
                        name: name.clone(),
                        version,
                        def_block: block.to_string(),
                    });
                    if let Some(phi) = phis.get_mut(&(block.to_string(), name.clone())) {
                        phi.version = version;
                    }
                }
            }

            // Ordinary writes.
            if let Some(events) = self.block_events.get(block) {
                for (name, op) in events {
                    if *op == DfgOp::Write {
                        let version = bump(versions, name);
                        stacks.entry(name.to_string()).or_default().push(version);
                        pushed.push(name.to_string());
                        variables.push(SsaVariable {
                            name: name.to_string(),
                            version,
                            def_block: block.to_string(),
                        });
                    }
                }
            }

            // Fill phi args of successors with the reaching versions.
            for succ in self.cfg.successors(block) {
                for (name, blocks) in self.phi_blocks {
                    if blocks.contains(succ) {
                        let incoming = stacks.get(name).and_then(|s| s.last().copied());
                        if let Some(version) = incoming {
                            if let Some(phi) = phis.get_mut(&(succ.to_string(), name.clone())) {
                                phi.args.push((block.to_string(), version));
                            }
                        }
                    }
                }
            }

            // Recurse down the dominator tree.
            if let Some(kids) = self.children.get(block) {
                for kid in kids {
                    self.visit(kid, versions, stacks, variables, phis);
                }
            }

            for name in pushed {
                if let Some(stack) = stacks.get_mut(&name) {
                    stack.pop();
                }
            }
        }
    }

    fn bump(versions: &mut BTreeMap<String, u32>, name: &str) -> u32 {
        let counter = versions.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    let renamer = Renamer {
        children: &children,
        block_events: &block_events,
        phi_blocks: &phi_blocks,
        cfg,
    };
    renamer.visit(
        &cfg.entry,
        &mut versions,
        &mut stacks,
        &mut variables,
        &mut phis,
    );

    let mut phis: Vec<PhiNode> = phis.into_values().collect();
    for phi in &mut phis {
        phi.args.sort();
        phi.args.dedup();
    }
    phis.retain(|p| !p.args.is_empty());
    variables.sort_by(|a, b| (&a.name, a.version).cmp(&(&b.name, b.version)));

    SsaForm {
        function_id: cfg.function_id.clone(),
        variables,
        phis,
    }
}

/// Build the PDG: control dependence from postdominance, data dependence
/// from def-use pairs.
pub fn build_pdg(cfg: &ControlFlowGraph, dfg: &DataFlowGraph) -> ProgramDependenceGraph {
    let postdom = compute_dominators(cfg, true);
    let mut pdg = ProgramDependenceGraph {
        function_id: cfg.function_id.clone(),
        edges: Vec::new(),
    };

    // Control dependence: for edge A→B where B does not postdominate A,
    // every block from B up to (excluding) A's immediate postdominator
    // depends on A.
    for edge in &cfg.edges {
        if matches!(edge.kind, CfgEdgeKind::Exception) {
            continue;
        }
        let a = edge.source.as_str();
        let b = edge.target.as_str();
        if postdom.dominates(b, a) {
            continue;
        }
        let stop = postdom.idom.get(a).cloned();
        let mut runner = b.to_string();
        loop {
            if Some(&runner) == stop.as_ref() {
                break;
            }
            pdg.edges
                .push((a.to_string(), runner.clone(), PdgEdgeKind::Control));
            match postdom.idom.get(&runner) {
                Some(parent) if *parent != runner => runner = parent.clone(),
                _ => break,
            }
        }
    }

    // Data dependence: write block → read block per variable.
    for variable in &dfg.variables {
        let writes = dfg.writes_of(&variable.id);
        let reads = dfg.reads_of(&variable.id);
        for write in &writes {
            for read in &reads {
                if write.block_id != read.block_id {
                    pdg.edges.push((
                        write.block_id.clone(),
                        read.block_id.clone(),
                        PdgEdgeKind::Data,
                    ));
                }
            }
        }
    }

    pdg.normalize();
    pdg
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::dataflow::build_dfg;
    use super::super::flow::lower_function;
    use crate::shared::models::{FunctionAttrs, ParamHint, Span, Stmt, StmtHint};

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

    /// x assigned in both branches of an if: classic phi shape.
    fn diamond() -> (ControlFlowGraph, DataFlowGraph) {
        let attrs = FunctionAttrs {
            params: vec![ParamHint::new("c")],
            body: vec![
                stmt(
                    2,
                    StmtHint::If {
                        cond_reads: vec!["c".into()],
                        then_body: vec![assign(3, "x", &[])],
                        else_body: vec![assign(5, "x", &[])],
                    },
                ),
                stmt(6, StmtHint::Return { reads: vec!["x".into()] }),
            ],
            ..Default::default()
        };
        let lowered = lower_function("f", &attrs, Span::new(1, 0, 6, 0));
        let dfg = build_dfg("f", &attrs, 6, &lowered, u32::MAX).unwrap();
        (lowered.cfg, dfg)
    }

    #[test]
    fn test_dominators_entry_dominates_all() {
        let (cfg, _) = diamond();
        let dom = compute_dominators(&cfg, false);
        for block in dom.idom.keys() {
            assert!(dom.dominates(&cfg.entry, block), "entry must dominate {block}");
        }
    }

    #[test]
    fn test_phi_placed_at_join() {
        let (cfg, dfg) = diamond();
        let dom = compute_dominators(&cfg, false);
        let ssa = build_ssa(&cfg, &dfg, &dom);

        let x_phis: Vec<&PhiNode> = ssa.phis.iter().filter(|p| p.variable == "x").collect();
        assert_eq!(x_phis.len(), 1, "one phi for x at the join");
        assert_eq!(x_phis[0].args.len(), 2, "two incoming versions");

        // Two branch definitions plus the phi version.
        assert_eq!(ssa.versions_of("x").len(), 3);
    }

    #[test]
    fn test_ssa_deterministic() {
        let (cfg_a, dfg_a) = diamond();
        let (cfg_b, dfg_b) = diamond();
        let dom_a = compute_dominators(&cfg_a, false);
        let dom_b = compute_dominators(&cfg_b, false);
        assert_eq!(build_ssa(&cfg_a, &dfg_a, &dom_a), build_ssa(&cfg_b, &dfg_b, &dom_b));
    }

    #[test]
    fn test_pdg_control_and_data_edges() {
        let (cfg, dfg) = diamond();
        let pdg = build_pdg(&cfg, &dfg);
        assert!(pdg.edges.iter().any(|(_, _, k)| *k == PdgEdgeKind::Control));
        assert!(pdg.edges.iter().any(|(_, _, k)| *k == PdgEdgeKind::Data));
    }
}

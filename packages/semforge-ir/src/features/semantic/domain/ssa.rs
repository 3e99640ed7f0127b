//! SSA form, dominator tree and program dependence graph models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dominator tree over a CFG, with dominance frontiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DominatorTree {
    pub function_id: String,
    /// Immediate dominator per block (entry maps to itself)
    pub idom: BTreeMap<String, String>,
    /// Dominance frontier per block, sorted
    pub frontier: BTreeMap<String, Vec<String>>,
}

impl DominatorTree {
    /// Does `a` dominate `b`? (reflexive)
    pub fn dominates(&self, a: &str, b: &str) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.idom.get(cur) {
                Some(parent) if parent != cur => cur = parent,
                _ => return false,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsaVariable {
    pub name: String,
    pub version: u32,
    pub def_block: String,
}

/// Phi node inserted at a join block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiNode {
    pub block_id: String,
    pub variable: String,
    pub version: u32,
    /// (predecessor block, incoming version), sorted by block id
    pub args: Vec<(String, u32)>,
}

/// Per-function SSA form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SsaForm {
    pub function_id: String,
    pub variables: Vec<SsaVariable>,
    pub phis: Vec<PhiNode>,
}

impl SsaForm {
    pub fn versions_of(&self, name: &str) -> Vec<&SsaVariable> {
        self.variables.iter().filter(|v| v.name == name).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PdgEdgeKind {
    Control,
    Data,
}

/// Program dependence graph: control deps from branch structure, data deps
/// from def-use chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProgramDependenceGraph {
    pub function_id: String,
    /// (source block, target block, kind), sorted
    pub edges: Vec<(String, String, PdgEdgeKind)>,
}

impl ProgramDependenceGraph {
    pub fn normalize(&mut self) {
        self.edges.sort();
        self.edges.dedup();
    }
}

//! Per-file semantic IR: the tier-dependent composition of all layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::cfg::ControlFlowGraph;
use super::dfg::DataFlowGraph;
use super::expression::Expression;
use super::signature::Signature;
use super::ssa::{DominatorTree, ProgramDependenceGraph, SsaForm};
use super::tier::{SemanticLayer, SemanticTier};
use crate::features::cache::{EstimateSize, FileId};
use crate::shared::models::Edge;

/// Immutable per-file semantic IR.
///
/// Which collections are populated depends on the tier the file was built
/// at; `layers()` reports what is actually present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticIR {
    pub file_id: FileId,
    pub tier: SemanticTier,
    pub signatures: Vec<Signature>,
    pub cfgs: Vec<ControlFlowGraph>,
    /// Call graph edges (caller function node → callee, possibly external)
    pub call_edges: Vec<Edge>,
    pub expressions: Vec<Expression>,
    pub dfgs: Vec<DataFlowGraph>,
    pub dominators: Vec<DominatorTree>,
    pub ssa: Vec<SsaForm>,
    pub pdgs: Vec<ProgramDependenceGraph>,
}

impl SemanticIR {
    pub fn empty(file_id: FileId, tier: SemanticTier) -> Self {
        Self {
            file_id,
            tier,
            signatures: Vec::new(),
            cfgs: Vec::new(),
            call_edges: Vec::new(),
            expressions: Vec::new(),
            dfgs: Vec::new(),
            dominators: Vec::new(),
            ssa: Vec::new(),
            pdgs: Vec::new(),
        }
    }

    /// Layers actually present in this IR.
    pub fn layers(&self) -> BTreeSet<SemanticLayer> {
        let mut layers = BTreeSet::new();
        if !self.cfgs.is_empty() {
            layers.insert(SemanticLayer::Cfg);
        }
        if !self.signatures.is_empty() {
            layers.insert(SemanticLayer::Signatures);
        }
        if !self.call_edges.is_empty() {
            layers.insert(SemanticLayer::CallGraph);
        }
        if !self.dfgs.is_empty() {
            layers.insert(SemanticLayer::Dfg);
        }
        if !self.expressions.is_empty() {
            layers.insert(SemanticLayer::Expressions);
        }
        if !self.ssa.is_empty() {
            layers.insert(SemanticLayer::Ssa);
        }
        if !self.dominators.is_empty() {
            layers.insert(SemanticLayer::Dominators);
        }
        if !self.pdgs.is_empty() {
            layers.insert(SemanticLayer::Pdg);
        }
        layers
    }

    pub fn cfg_for(&self, function_id: &str) -> Option<&ControlFlowGraph> {
        self.cfgs.iter().find(|c| c.function_id == function_id)
    }

    pub fn signature_for(&self, function_id: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.function_id == function_id)
    }

    /// Canonicalize every layer's ordering. Called once before the IR is
    /// committed to a snapshot or cache.
    pub fn normalize(&mut self) {
        self.signatures.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        for cfg in &mut self.cfgs {
            cfg.normalize();
        }
        self.cfgs.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        self.call_edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.call_edges.dedup();
        self.expressions.sort_by(|a, b| a.id.cmp(&b.id));
        for dfg in &mut self.dfgs {
            dfg.normalize();
        }
        self.dfgs.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        self.dominators.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        self.ssa.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        for pdg in &mut self.pdgs {
            pdg.normalize();
        }
        self.pdgs.sort_by(|a, b| a.function_id.cmp(&b.function_id));
    }
}

impl EstimateSize for SemanticIR {
    fn estimated_size_bytes(&self) -> usize {
        let blocks: usize = self.cfgs.iter().map(|c| c.blocks.len() * 96 + c.edges.len() * 48).sum();
        let dfg: usize = self
            .dfgs
            .iter()
            .map(|d| d.variables.len() * 80 + d.events.len() * 64 + d.edges.len() * 48)
            .sum();
        let exprs = self.expressions.len() * 128;
        let sigs = self.signatures.len() * 160;
        let ssa: usize = self.ssa.iter().map(|s| s.variables.len() * 48 + s.phis.len() * 96).sum();
        std::mem::size_of::<Self>() + blocks + dfg + exprs + sigs + ssa
    }
}

//! Semantic analysis tiers and the layer sets they enable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SemanticTier {
    Base,
    Extended,
    Full,
}

impl SemanticTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticTier::Base => "base",
            SemanticTier::Extended => "extended",
            SemanticTier::Full => "full",
        }
    }

    /// Layers enabled at this tier. Strictly monotone:
    /// `layers(Base) ⊂ layers(Extended) ⊂ layers(Full)`.
    pub fn layers(&self) -> BTreeSet<SemanticLayer> {
        use SemanticLayer::*;
        let mut layers = BTreeSet::from([Cfg, Signatures, CallGraph]);
        if *self >= SemanticTier::Extended {
            layers.insert(Dfg);
            layers.insert(Expressions);
        }
        if *self >= SemanticTier::Full {
            layers.insert(Ssa);
            layers.insert(Dominators);
            layers.insert(Pdg);
            layers.insert(InterproceduralDfg);
        }
        layers
    }

    pub fn enables(&self, layer: SemanticLayer) -> bool {
        self.layers().contains(&layer)
    }
}

impl std::fmt::Display for SemanticTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Individual semantic layers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SemanticLayer {
    Cfg,
    Signatures,
    CallGraph,
    Dfg,
    Expressions,
    Ssa,
    Dominators,
    Pdg,
    InterproceduralDfg,
}

/// Concrete options derived from a tier (overridable downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierOptions {
    pub cfg: bool,
    pub dfg: bool,
    pub ssa: bool,
    pub expressions: bool,
    pub interprocedural: bool,
    /// Skip DFG for functions above this many lines.
    pub dfg_function_loc_threshold: u32,
}

impl TierOptions {
    pub fn for_tier(tier: SemanticTier) -> Self {
        Self {
            cfg: true,
            dfg: tier >= SemanticTier::Extended,
            ssa: tier >= SemanticTier::Full,
            expressions: tier >= SemanticTier::Extended,
            interprocedural: tier >= SemanticTier::Full,
            dfg_function_loc_threshold: match tier {
                SemanticTier::Base => 0,
                SemanticTier::Extended => 800,
                SemanticTier::Full => 3000,
            },
        }
    }
}

//! Tier-planned semantic IR: domain models, planner and builder.

pub mod builder;
pub mod domain;
pub mod planner;

pub use builder::{ProjectContext, SemanticBuildError, SemanticBuilder};
pub use domain::{SemanticIR, SemanticLayer, SemanticTier, TierOptions};
pub use planner::{AgentIntent, PlanError, Planner, QueryType, Scope, TierPlan};

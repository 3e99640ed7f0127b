//! Tier planner: maps agent intent, query type and scope to a tier plan.
//!
//! The decision table is fixed. Slice and path queries need the full
//! dependence machinery; flow and origin queries need data flow; everything
//! else runs at BASE. Combinations the table does not recognize fall back
//! conservatively to the query-derived tier, never below it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::domain::{SemanticTier, TierOptions};
use crate::config::BuildConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentIntent {
    Explore,
    Edit,
    Debug,
    Review,
    Refactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    Search,
    Structure,
    Callers,
    References,
    Flow,
    Origin,
    Slice,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    File,
    Module,
    Repository,
}

/// Resolved plan: the tier plus the options it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPlan {
    pub tier: SemanticTier,
    pub options: TierOptions,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The requested tier needs layers the config has disabled.
    #[error("requested tier {requested} incompatible with config: {reason}")]
    PlanRejected {
        requested: SemanticTier,
        reason: String,
    },
}

#[derive(Debug, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Map `(intent, query, scope)` to a tier plan.
    pub fn plan(&self, intent: AgentIntent, query: QueryType, scope: Scope) -> TierPlan {
        let tier = Self::decide(intent, query, scope);
        TierPlan {
            tier,
            options: TierOptions::for_tier(tier),
        }
    }

    /// Explicit tier override, validated against the config. An override
    /// may narrow layers below its tier (e.g. FULL without expressions)
    /// but a config that disables a layer the tier requires is rejected.
    pub fn plan_override(
        &self,
        tier: SemanticTier,
        config: &BuildConfig,
    ) -> Result<TierPlan, PlanError> {
        if tier >= SemanticTier::Full && !config.ssa {
            return Err(PlanError::PlanRejected {
                requested: tier,
                reason: "FULL requires ssa".into(),
            });
        }
        if tier >= SemanticTier::Extended && !config.dfg && !config.expressions {
            return Err(PlanError::PlanRejected {
                requested: tier,
                reason: "EXTENDED requires dfg or expressions".into(),
            });
        }
        if !config.cfg {
            return Err(PlanError::PlanRejected {
                requested: tier,
                reason: "cfg is mandatory at every tier".into(),
            });
        }

        let mut options = TierOptions::for_tier(tier);
        // Downward overrides from config are honored.
        options.dfg &= config.dfg;
        options.ssa &= config.ssa;
        options.expressions &= config.expressions;
        options.dfg_function_loc_threshold = config.dfg_function_loc_threshold;
        Ok(TierPlan { tier, options })
    }

    fn decide(intent: AgentIntent, query: QueryType, scope: Scope) -> SemanticTier {
        // Query type dominates.
        let from_query = match query {
            QueryType::Slice | QueryType::Path => SemanticTier::Full,
            QueryType::Flow | QueryType::Origin => SemanticTier::Extended,
            _ => SemanticTier::Base,
        };

        // Debugging and refactoring over a whole repository want data flow
        // even for structural queries.
        let from_intent = match (intent, scope) {
            (AgentIntent::Debug, _) | (AgentIntent::Refactor, Scope::Repository) => {
                SemanticTier::Extended
            }
            _ => SemanticTier::Base,
        };

        from_query.max(from_intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_and_path_go_full() {
        let planner = Planner::new();
        for query in [QueryType::Slice, QueryType::Path] {
            let plan = planner.plan(AgentIntent::Explore, query, Scope::File);
            assert_eq!(plan.tier, SemanticTier::Full);
            assert!(plan.options.ssa);
        }
    }

    #[test]
    fn test_flow_and_origin_go_extended() {
        let planner = Planner::new();
        for query in [QueryType::Flow, QueryType::Origin] {
            let plan = planner.plan(AgentIntent::Explore, query, Scope::Module);
            assert_eq!(plan.tier, SemanticTier::Extended);
            assert!(plan.options.dfg && !plan.options.ssa);
        }
    }

    #[test]
    fn test_default_is_base() {
        let planner = Planner::new();
        let plan = planner.plan(AgentIntent::Explore, QueryType::Search, Scope::Repository);
        assert_eq!(plan.tier, SemanticTier::Base);
    }

    #[test]
    fn test_debug_intent_bumps_to_extended() {
        let planner = Planner::new();
        let plan = planner.plan(AgentIntent::Debug, QueryType::Search, Scope::File);
        assert_eq!(plan.tier, SemanticTier::Extended);
    }

    #[test]
    fn test_override_rejected_when_config_disables_ssa() {
        let planner = Planner::new();
        let config = BuildConfig {
            ssa: false,
            ..BuildConfig::default()
        };
        let err = planner
            .plan_override(SemanticTier::Full, &config)
            .unwrap_err();
        assert!(matches!(err, PlanError::PlanRejected { .. }));
    }

    #[test]
    fn test_override_honors_downward_flags() {
        let planner = Planner::new();
        let config = BuildConfig {
            dfg: false,
            ..BuildConfig::default()
        };
        let plan = planner
            .plan_override(SemanticTier::Extended, &config)
            .unwrap();
        assert_eq!(plan.tier, SemanticTier::Extended);
        assert!(!plan.options.dfg);
        assert!(plan.options.expressions);
    }
}

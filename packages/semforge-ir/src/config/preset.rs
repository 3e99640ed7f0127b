//! Configuration presets.

use serde::{Deserialize, Serialize};

use crate::features::semantic::domain::SemanticTier;

/// Preset profiles mapping to tier and sizing defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    /// BASE tier, minimal layers, smallest caches
    Fast,
    /// EXTENDED tier with default sizing
    Balanced,
    /// FULL tier, generous caches
    Thorough,
}

impl Preset {
    pub fn tier(&self) -> SemanticTier {
        match self {
            Preset::Fast => SemanticTier::Base,
            Preset::Balanced => SemanticTier::Extended,
            Preset::Thorough => SemanticTier::Full,
        }
    }

    pub fn l1_max_bytes(&self) -> u64 {
        match self {
            Preset::Fast => 128 * 1024 * 1024,
            Preset::Balanced => 512 * 1024 * 1024,
            Preset::Thorough => 1024 * 1024 * 1024,
        }
    }

    pub fn dfg_function_loc_threshold(&self) -> u32 {
        match self {
            Preset::Fast => 0,
            Preset::Balanced => 800,
            Preset::Thorough => 3000,
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Preset::Fast => "fast",
            Preset::Balanced => "balanced",
            Preset::Thorough => "thorough",
        };
        write!(f, "{s}")
    }
}

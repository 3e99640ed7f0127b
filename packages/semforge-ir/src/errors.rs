//! Crate-level error surface.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::cache::CacheError;
use crate::features::semantic::PlanError;
use crate::pipeline::BuildError;

/// Umbrella error for embedders that want one type at the boundary.
#[derive(Error, Debug)]
pub enum SemforgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, SemforgeError>;

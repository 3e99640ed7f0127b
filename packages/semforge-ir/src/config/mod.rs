//! Build configuration: presets, env overrides, provenance, config hash.

mod build_config;
mod error;
mod preset;
mod provenance;

pub use build_config::{BuildConfig, GcPolicy};
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use provenance::{ConfigProvenance, ConfigSource};

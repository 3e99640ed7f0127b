//! Build configuration: one immutable value per build.
//!
//! The config hash covers a whitelist of options that affect output
//! (tier, layer flags, DFG threshold, language/tool version) and nothing
//! else. Cache sizing, worker counts and directory placement never reach
//! the hash, so tuning them cannot silently invalidate caches.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::provenance::{ConfigProvenance, ConfigSource};
use crate::features::cache::{ConfigHash, TierSettings};
use crate::features::semantic::domain::SemanticTier;

/// Snapshot retention policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcPolicy {
    pub keep_latest_count: usize,
    pub keep_days: u32,
    /// Tagged snapshots are retained permanently when set.
    pub keep_tagged: bool,
}

impl Default for GcPolicy {
    fn default() -> Self {
        Self {
            keep_latest_count: 5,
            keep_days: 30,
            keep_tagged: true,
        }
    }
}

/// Immutable per-build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub repo_id: String,

    // ── Whitelisted: these affect output and feed the config hash ──
    pub semantic_tier: SemanticTier,
    /// Forced true at every tier; kept as an option for symmetry.
    pub cfg: bool,
    pub dfg: bool,
    pub ssa: bool,
    pub expressions: bool,
    pub dfg_function_loc_threshold: u32,
    /// Language/tool version of the parser front end.
    pub language_version: String,

    // ── Cache placement and sizing (not hashed) ──
    pub enable_three_tier_cache: bool,
    pub cache_root: PathBuf,
    pub l0_max_files: u32,
    pub l1_max_bytes: u64,
    pub l1_max_entries: u32,
    pub engine_version: String,
    pub schema_version: u16,

    // ── Execution (not hashed) ──
    pub parallel_workers: u32,
    pub gc: GcPolicy,

    #[serde(skip)]
    pub provenance: Option<ConfigProvenance>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            repo_id: "default".to_string(),
            semantic_tier: SemanticTier::Base,
            cfg: true,
            dfg: true,
            ssa: true,
            expressions: true,
            dfg_function_loc_threshold: 800,
            language_version: "py3".to_string(),
            enable_three_tier_cache: true,
            cache_root: PathBuf::from(".semforge/cache"),
            l0_max_files: 2000,
            l1_max_bytes: 512 * 1024 * 1024,
            l1_max_entries: 4096,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: 1,
            parallel_workers: num_cpus::get() as u32,
            gc: GcPolicy::default(),
            provenance: None,
        }
    }
}

impl BuildConfig {
    /// Start from a preset.
    pub fn from_preset(preset: Preset) -> Self {
        let mut config = Self {
            semantic_tier: preset.tier(),
            dfg_function_loc_threshold: preset.dfg_function_loc_threshold(),
            l1_max_bytes: preset.l1_max_bytes(),
            ..Self::default()
        };
        config.provenance = Some(ConfigProvenance::from_preset(preset));
        config
    }

    /// Apply recognized environment variables on top of this config. All
    /// are optional; unset or empty variables leave the value alone.
    pub fn apply_env(mut self) -> ConfigResult<Self> {
        let mut prov = self
            .provenance
            .take()
            .unwrap_or_else(|| ConfigProvenance::from_preset(Preset::Balanced));

        if let Some(root) = read_env("CACHE_ROOT")? {
            self.cache_root = PathBuf::from(root);
            prov.track_field("cache_root", ConfigSource::Env("CACHE_ROOT".into()));
        }
        if let Some(version) = read_env("ENGINE_VERSION")? {
            self.engine_version = version;
            prov.track_field("engine_version", ConfigSource::Env("ENGINE_VERSION".into()));
        }
        if let Some(version) = read_env("SCHEMA_VERSION")? {
            self.schema_version = parse_env("SCHEMA_VERSION", &version)?;
            prov.track_field("schema_version", ConfigSource::Env("SCHEMA_VERSION".into()));
        }
        if let Some(workers) = read_env("PARALLEL_WORKERS")? {
            self.parallel_workers = parse_env("PARALLEL_WORKERS", &workers)?;
            prov.track_field(
                "parallel_workers",
                ConfigSource::Env("PARALLEL_WORKERS".into()),
            );
        }
        if let Some(enabled) = read_env("ENABLE_THREE_TIER_CACHE")? {
            self.enable_three_tier_cache = matches!(enabled.as_str(), "1" | "true" | "yes");
            prov.track_field(
                "enable_three_tier_cache",
                ConfigSource::Env("ENABLE_THREE_TIER_CACHE".into()),
            );
        }
        if let Some(bytes) = read_env("L1_MAX_BYTES")? {
            self.l1_max_bytes = parse_env("L1_MAX_BYTES", &bytes)?;
            prov.track_field("l1_max_bytes", ConfigSource::Env("L1_MAX_BYTES".into()));
        }

        self.provenance = Some(prov);
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.parallel_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "parallel_workers",
                reason: "must be >= 1".into(),
            });
        }
        if self.l0_max_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "l0_max_files",
                reason: "must be >= 1".into(),
            });
        }
        if self.l1_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "l1_max_entries",
                reason: "must be >= 1".into(),
            });
        }
        if self.engine_version.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine_version",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Hash of the whitelisted options, canonical tuple encoding. Options
    /// outside the whitelist must not affect this value.
    pub fn config_hash(&self) -> ConfigHash {
        let canonical = (
            self.semantic_tier.as_str(),
            self.cfg,
            self.dfg,
            self.ssa,
            self.expressions,
            self.dfg_function_loc_threshold,
            self.language_version.as_str(),
        );
        let bytes = rmp_serde::to_vec(&canonical).expect("config tuple encodes");
        ConfigHash::compute(&bytes)
    }

    /// Tier settings for one cache namespace.
    pub fn tier_settings(&self) -> TierSettings {
        TierSettings {
            l0_max_files: self.l0_max_files as usize,
            l1_max_entries: self.l1_max_entries as usize,
            l1_max_bytes: self.l1_max_bytes,
            engine_version: self.engine_version.clone(),
            schema_version: self.schema_version,
            enable_three_tier: self.enable_three_tier_cache,
        }
    }
}

fn read_env(var: &'static str) -> ConfigResult<Option<String>> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        Ok(_) => Ok(None),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::InvalidEnv {
            var,
            reason: err.to_string(),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_hash_covers_whitelist() {
        let base = BuildConfig::default();
        let h = base.config_hash();

        // Each whitelisted option changes the hash.
        let mut c = base.clone();
        c.semantic_tier = SemanticTier::Full;
        assert_ne!(c.config_hash(), h);

        let mut c = base.clone();
        c.dfg = false;
        assert_ne!(c.config_hash(), h);

        let mut c = base.clone();
        c.ssa = false;
        assert_ne!(c.config_hash(), h);

        let mut c = base.clone();
        c.expressions = false;
        assert_ne!(c.config_hash(), h);

        let mut c = base.clone();
        c.dfg_function_loc_threshold = 100;
        assert_ne!(c.config_hash(), h);

        let mut c = base.clone();
        c.language_version = "py2".into();
        assert_ne!(c.config_hash(), h);
    }

    #[test]
    fn test_config_hash_ignores_non_whitelisted() {
        let base = BuildConfig::default();
        let h = base.config_hash();

        let mut c = base.clone();
        c.parallel_workers = 1;
        c.l1_max_bytes = 1;
        c.l1_max_entries = 1;
        c.l0_max_files = 1;
        c.enable_three_tier_cache = false;
        c.cache_root = PathBuf::from("/elsewhere");
        c.repo_id = "other".into();
        assert_eq!(c.config_hash(), h);
    }

    #[test]
    fn test_preset_shapes_config() {
        let fast = BuildConfig::from_preset(Preset::Fast);
        assert_eq!(fast.semantic_tier, SemanticTier::Base);
        assert_eq!(fast.dfg_function_loc_threshold, 0);

        let thorough = BuildConfig::from_preset(Preset::Thorough);
        assert_eq!(thorough.semantic_tier, SemanticTier::Full);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = BuildConfig {
            parallel_workers: 0,
            ..BuildConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        std::env::set_var("L1_MAX_BYTES", "12345");
        std::env::set_var("PARALLEL_WORKERS", "3");
        std::env::set_var("ENABLE_THREE_TIER_CACHE", "false");

        let config = BuildConfig::default().apply_env().unwrap();
        assert_eq!(config.l1_max_bytes, 12345);
        assert_eq!(config.parallel_workers, 3);
        assert!(!config.enable_three_tier_cache);

        let prov = config.provenance.as_ref().unwrap();
        assert!(matches!(
            prov.get_source("l1_max_bytes"),
            Some(ConfigSource::Env(_))
        ));

        std::env::remove_var("L1_MAX_BYTES");
        std::env::remove_var("PARALLEL_WORKERS");
        std::env::remove_var("ENABLE_THREE_TIER_CACHE");
    }

    #[test]
    fn test_bad_env_value_is_a_hard_error() {
        std::env::set_var("SCHEMA_VERSION", "not-a-number");
        let result = BuildConfig::default().apply_env();
        std::env::remove_var("SCHEMA_VERSION");
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }
}

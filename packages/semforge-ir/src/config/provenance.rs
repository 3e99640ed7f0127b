//! Configuration provenance: where each overridden value came from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::preset::Preset;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Preset(Preset),
    Env(String),
    Builder,
}

impl ConfigSource {
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Preset(p) => format!("preset:{p}"),
            ConfigSource::Env(var) => format!("env:{var}"),
            ConfigSource::Builder => "builder".to_string(),
        }
    }
}

/// Field-level provenance tracking. Purely diagnostic: never part of the
/// config hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProvenance {
    preset: Preset,
    field_sources: BTreeMap<String, ConfigSource>,
}

impl ConfigProvenance {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            preset,
            field_sources: BTreeMap::new(),
        }
    }

    pub fn track_field(&mut self, field_path: &str, source: ConfigSource) {
        self.field_sources.insert(field_path.to_string(), source);
    }

    pub fn get_source(&self, field_path: &str) -> Option<&ConfigSource> {
        self.field_sources.get(field_path)
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Human-readable summary, fields sorted.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Base preset: {}", self.preset)];
        if !self.field_sources.is_empty() {
            lines.push("Overridden fields:".to_string());
            for (field, source) in &self.field_sources {
                lines.push(format!("  {} <- {}", field, source.describe()));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_and_summary() {
        let mut prov = ConfigProvenance::from_preset(Preset::Balanced);
        prov.track_field("l1_max_bytes", ConfigSource::Env("L1_MAX_BYTES".into()));
        prov.track_field("semantic_tier", ConfigSource::Builder);

        assert!(matches!(
            prov.get_source("semantic_tier"),
            Some(ConfigSource::Builder)
        ));

        let summary = prov.summary();
        assert!(summary.contains("balanced"));
        assert!(summary.contains("l1_max_bytes"));
        assert!(summary.contains("env:L1_MAX_BYTES"));
    }

    #[test]
    fn test_last_write_wins() {
        let mut prov = ConfigProvenance::from_preset(Preset::Fast);
        prov.track_field("parallel_workers", ConfigSource::Builder);
        prov.track_field(
            "parallel_workers",
            ConfigSource::Env("PARALLEL_WORKERS".into()),
        );
        assert!(matches!(
            prov.get_source("parallel_workers"),
            Some(ConfigSource::Env(_))
        ));
    }
}

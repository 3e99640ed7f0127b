//! Build provenance: the record that makes determinism checkable.
//!
//! Two builds are deterministically equivalent iff all four fingerprints
//! match: inputs, builder, config and external dependencies. Timestamps
//! and durations are diagnostic only and never part of equivalence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::BuildConfig;
use crate::features::cache::{ConfigHash, ContentHash, FileId, Hash128};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildProvenance {
    /// `hash(repo_rev ‖ sort(file_hashes))`
    pub input_fingerprint: Hash128,
    /// Hash of the builder code identity (crate version + record schema)
    pub builder_version: Hash128,
    /// Whitelisted config hash
    pub config_fingerprint: ConfigHash,
    /// Versions of external parsers/resolvers
    pub dependency_fingerprint: Hash128,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// Seed for any randomized tie-breaks in parallel stages
    pub parallel_seed: u64,
}

impl BuildProvenance {
    /// Fingerprint the inputs: repo revision plus sorted per-file content
    /// hashes.
    pub fn input_fingerprint(
        repo_rev: &str,
        file_hashes: &[(FileId, ContentHash)],
    ) -> Hash128 {
        let mut sorted: Vec<&(FileId, ContentHash)> = file_hashes.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut parts: Vec<u8> = Vec::new();
        parts.extend_from_slice(repo_rev.as_bytes());
        parts.push(0);
        for (file_id, hash) in sorted {
            parts.extend_from_slice(file_id.as_str().as_bytes());
            parts.push(0);
            parts.extend_from_slice(hash.0.as_bytes());
        }
        Hash128::compute(&parts)
    }

    pub fn builder_version(config: &BuildConfig) -> Hash128 {
        Hash128::of_parts(&[
            env!("CARGO_PKG_VERSION").as_bytes(),
            &config.schema_version.to_be_bytes(),
        ])
    }

    pub fn dependency_fingerprint(parser_version: &str, types_version: &str) -> Hash128 {
        Hash128::of_parts(&[parser_version.as_bytes(), b"\0", types_version.as_bytes()])
    }

    /// Deterministic equivalence: all four fingerprints equal.
    pub fn equivalent(&self, other: &Self) -> bool {
        self.input_fingerprint == other.input_fingerprint
            && self.builder_version == other.builder_version
            && self.config_fingerprint == other.config_fingerprint
            && self.dependency_fingerprint == other.dependency_fingerprint
    }

    /// The parallel seed is derived from the fingerprints, so reruns of
    /// the same inputs break ties identically.
    pub fn derive_seed(input: &Hash128, config: ConfigHash) -> u64 {
        let h = Hash128::of_parts(&[input.as_bytes(), &config.0.to_le_bytes()]);
        u64::from_le_bytes(h.as_bytes()[..8].try_into().expect("8 bytes"))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (value.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

//! Core identifier and key types for the tiered cache.
//!
//! All digests are Blake3 truncated to 128 bits: stable across processes
//! and machines, uniform, and cheap to compare. The semantic cache key is
//! derived from content, structure and config only; the file path is
//! deliberately excluded so that renames and moves keep hitting.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::error::{CacheError, CacheResult};

/// Language enum (interned)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Rust,
    Java,
    Kotlin,
    Go,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Go => "go",
        }
    }
}

/// Repository-relative file path, normalized: forward slashes, no leading
/// `./`. Interned via `Arc<str>` so clones are cheap across cache layers.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct FileId(Arc<str>);

impl FileId {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(Self::normalize(path.as_ref()).as_str()))
    }

    fn normalize(path: &str) -> String {
        let forward = path.replace('\\', "/");
        let trimmed = forward.strip_prefix("./").unwrap_or(&forward);
        trimmed.to_string()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Parent directory components, root-first (used for module synthesis).
    pub fn parent_components(&self) -> Vec<&str> {
        match self.0.rsplit_once('/') {
            Some((dir, _)) => dir.split('/').collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FileId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FileId::new(s))
    }
}

/// 128-bit content digest (Blake3, truncated).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Hash128([u8; 16]);

impl Hash128 {
    pub fn compute(bytes: &[u8]) -> Self {
        let full = blake3::hash(bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&full.as_bytes()[..16]);
        Self(out)
    }

    /// Digest over a sequence of byte parts, order-sensitive.
    pub fn of_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        let full = hasher.finalize();
        let mut out = [0u8; 16];
        out.copy_from_slice(&full.as_bytes()[..16]);
        Self(out)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn zero() -> Self {
        Self([0u8; 16])
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(32);
        for b in &self.0 {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }

    pub fn from_hex(hex: &str) -> CacheResult<Self> {
        if hex.len() != 32 {
            return Err(CacheError::Internal(format!(
                "bad hash hex length {}",
                hex.len()
            )));
        }
        let mut out = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk)
                .map_err(|_| CacheError::Internal("bad hash hex".into()))?;
            out[i] = u8::from_str_radix(s, 16)
                .map_err(|_| CacheError::Internal("bad hash hex".into()))?;
        }
        Ok(Self(out))
    }
}

impl Serialize for Hash128 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash128 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash128::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash of raw file bytes; the identity of content independent of path.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub Hash128);

impl ContentHash {
    pub fn compute(bytes: &[u8]) -> Self {
        Self(Hash128::compute(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

/// Hash over the canonical byte layout of a structural IR; the identity of
/// structure independent of formatting the parser normalizes away.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructuralDigest(pub Hash128);

impl StructuralDigest {
    pub fn compute(packed_bytes: &[u8]) -> Self {
        Self(Hash128::compute(packed_bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

/// 64-bit hash of the whitelisted configuration options.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigHash(pub u64);

impl ConfigHash {
    pub fn compute(canonical: &[u8]) -> Self {
        let full = blake3::hash(canonical);
        let mut out = [0u8; 8];
        out.copy_from_slice(&full.as_bytes()[..8]);
        Self(u64::from_le_bytes(out))
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

/// Semantic cache key: `hash128(content ‖ structural ‖ config)`.
///
/// The file path is excluded; a rename without content change hits.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SemanticCacheKey(pub Hash128);

impl SemanticCacheKey {
    pub fn derive(content: &ContentHash, structural: &StructuralDigest, config: ConfigHash) -> Self {
        Self(Hash128::of_parts(&[
            content.0.as_bytes(),
            structural.0.as_bytes(),
            &config.0.to_le_bytes(),
        ]))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

/// File metadata for the L0 fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Last modified time (nanoseconds since Unix epoch)
    pub mtime_ns: u64,
    pub size_bytes: u64,
    pub content_hash: ContentHash,
}

impl FileMetadata {
    pub fn new(mtime_ns: u64, size_bytes: u64, content_hash: ContentHash) -> Self {
        Self {
            mtime_ns,
            size_bytes,
            content_hash,
        }
    }

    /// Fast path check: mtime + size only, no hashing.
    pub fn matches_fast(&self, mtime_ns: u64, size_bytes: u64) -> bool {
        self.mtime_ns == mtime_ns && self.size_bytes == size_bytes
    }

    /// Stat + hash a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CacheResult<(Self, Vec<u8>)> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        let mtime_ns = meta
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|e| CacheError::Internal(format!("invalid mtime: {e}")))?
            .as_nanos() as u64;
        let bytes = fs::read(path)?;
        let content_hash = ContentHash::compute(&bytes);
        Ok((Self::new(mtime_ns, meta.len(), content_hash), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_normalization() {
        assert_eq!(FileId::new("./a/b.py").as_str(), "a/b.py");
        assert_eq!(FileId::new("a\\b\\c.py").as_str(), "a/b/c.py");
        assert_eq!(FileId::new("a/b.py"), FileId::new("./a\\b.py"));
    }

    #[test]
    fn test_hash128_deterministic() {
        let h1 = Hash128::compute(b"print('hello')");
        let h2 = Hash128::compute(b"print('hello')");
        assert_eq!(h1, h2);
        assert_ne!(h1, Hash128::compute(b"other"));
    }

    #[test]
    fn test_hash128_hex_roundtrip() {
        let h = Hash128::compute(b"test");
        assert_eq!(Hash128::from_hex(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn test_semantic_key_excludes_path() {
        let content = ContentHash::compute(b"def foo(): pass");
        let digest = StructuralDigest::compute(b"packed");
        let config = ConfigHash::compute(b"tier=base");

        // Same content/structure/config from two different paths → same key.
        let k1 = SemanticCacheKey::derive(&content, &digest, config);
        let k2 = SemanticCacheKey::derive(&content, &digest, config);
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_semantic_key_sensitive_to_each_component() {
        let content = ContentHash::compute(b"a");
        let digest = StructuralDigest::compute(b"b");
        let config = ConfigHash::compute(b"c");
        let base = SemanticCacheKey::derive(&content, &digest, config);

        let other_content = ContentHash::compute(b"a2");
        assert_ne!(SemanticCacheKey::derive(&other_content, &digest, config), base);

        let other_digest = StructuralDigest::compute(b"b2");
        assert_ne!(SemanticCacheKey::derive(&content, &other_digest, config), base);

        let other_config = ConfigHash::compute(b"c2");
        assert_ne!(SemanticCacheKey::derive(&content, &digest, other_config), base);
    }

    #[test]
    fn test_metadata_fast_path() {
        let meta = FileMetadata::new(123, 42, ContentHash::compute(b"x"));
        assert!(meta.matches_fast(123, 42));
        assert!(!meta.matches_fast(124, 42));
        assert!(!meta.matches_fast(123, 43));
    }
}

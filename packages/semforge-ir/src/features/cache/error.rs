//! Error types for the cache system.
//!
//! Cache errors never escape the tiered facade: corruption and schema
//! mismatches degrade to misses, write denials are counted and swallowed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Framing or checksum mismatch on an L2 record.
    #[error("cache entry corrupted: {0}")]
    Corrupt(String),

    /// On-disk record written by an incompatible schema version.
    #[error("cache schema mismatch: found {found}, expected {expected}")]
    SchemaMismatch { found: u16, expected: u16 },

    /// Read raced a concurrent replace or hit a transient permission error.
    #[error("transient cache read failure: {0}")]
    Transient(String),

    /// Disk full or permanent permission failure on write.
    #[error("cache write denied: {0}")]
    WriteDenied(String),

    #[error("disk full")]
    DiskFull,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Category label for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            CacheError::Corrupt(_) => "corrupt",
            CacheError::SchemaMismatch { .. } => "schema_mismatch",
            CacheError::Transient(_) => "transient",
            CacheError::WriteDenied(_) => "write_denied",
            CacheError::DiskFull => "disk_full",
            CacheError::Serialization(_) => "serialization",
            CacheError::Deserialization(_) => "deserialization",
            CacheError::Io(_) => "io",
            CacheError::Internal(_) => "internal",
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

//! Three-tier content-addressed cache.
//!
//! - **L0 (session cache)**: builder state, FileId-keyed, stat fast path
//! - **L1 (memory cache)**: strict LRU, bounded by entries and bytes
//! - **L2 (disk cache)**: framed binary records, checksum, atomic rename
//!
//! Applied to structural IR, semantic IR and graph documents, one
//! namespace each.

mod error;
mod l0_session_cache;
mod l1_memory_cache;
mod l2_disk_cache;
mod metrics;
mod record;
mod tiered_cache;
mod types;

pub use error::{CacheError, CacheResult};
pub use l0_session_cache::SessionCache;
pub use l1_memory_cache::{EstimateSize, MemoryCache};
pub use l2_disk_cache::{CacheNamespace, DiskCache, GRAPH_NS, SEMANTIC_NS, STRUCTURAL_NS};
pub use metrics::{CacheStats, TieredCacheMetrics};
pub use record::{decode_record, encode_record, HEADER_LEN};
pub use tiered_cache::{TierSettings, TieredCache};
pub use types::{
    ConfigHash, ContentHash, FileId, FileMetadata, Hash128, Language, SemanticCacheKey,
    StructuralDigest,
};

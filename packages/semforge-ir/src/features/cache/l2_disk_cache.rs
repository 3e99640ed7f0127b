//! L2 disk cache: persistent framed records under a version-isolated dir.
//!
//! Layout: `<root>/<domain>/<engine_version>/<schema_version>/<key_hex>.<ext>`.
//! Writes go to a uniquely named temp file, fsync, then atomic rename; the
//! rename is the commit point, so concurrent writers are safe and a reader
//! never sees a half-written record. A writer finding a committed file for
//! its key skips the write (write-once).
//!
//! Corrupt or schema-mismatched records are deleted on read and reported as
//! misses. Transient read errors (concurrent replace, transient permission)
//! are retried 3 times with 20 ms backoff. Disk-full and permission
//! failures on write are counted and swallowed; a build never fails because
//! the disk did.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::CacheError;
use super::metrics::TieredCacheMetrics;
use super::record::{decode_record, encode_record};
use super::types::Hash128;

const READ_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// One cache namespace: directory domain, record magic, file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheNamespace {
    pub domain: &'static str,
    pub magic: [u8; 4],
    pub ext: &'static str,
}

/// Structural IR records.
pub const STRUCTURAL_NS: CacheNamespace = CacheNamespace {
    domain: "structural",
    magic: *b"SSIR",
    ext: "sir",
};

/// Semantic IR records.
pub const SEMANTIC_NS: CacheNamespace = CacheNamespace {
    domain: "semantic",
    magic: *b"SSEM",
    ext: "sem",
};

/// Materialized graph documents.
pub const GRAPH_NS: CacheNamespace = CacheNamespace {
    domain: "graph",
    magic: *b"SGPH",
    ext: "gph",
};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// L2 persistent cache for one namespace.
pub struct DiskCache {
    dir: PathBuf,
    namespace: CacheNamespace,
    schema_version: u16,
    metrics: Arc<TieredCacheMetrics>,
}

impl DiskCache {
    pub fn new(
        root: &Path,
        namespace: CacheNamespace,
        engine_version: &str,
        schema_version: u16,
        metrics: Arc<TieredCacheMetrics>,
    ) -> std::io::Result<Self> {
        let dir = root
            .join(namespace.domain)
            .join(engine_version)
            .join(schema_version.to_string());
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            namespace,
            schema_version,
            metrics,
        })
    }

    pub fn entry_path(&self, key: &Hash128) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.to_hex(), self.namespace.ext))
    }

    /// Read a record. All failures degrade to `None`; corrupt and
    /// schema-mismatched files are deleted so the next write replaces them.
    pub fn get<V: DeserializeOwned>(&self, key: &Hash128) -> Option<V> {
        let path = self.entry_path(key);

        let mut attempt = 0;
        let bytes = loop {
            match read_all(&path) {
                Ok(Some(bytes)) => break bytes,
                Ok(None) => return None,
                Err(err) => {
                    attempt += 1;
                    if attempt > READ_RETRIES {
                        tracing::warn!(path = %path.display(), %err, "L2 read failed after retries");
                        return None;
                    }
                    self.metrics.transient_retries.inc();
                    std::thread::sleep(RETRY_BACKOFF);
                }
            }
        };

        match decode_record::<V>(&bytes, self.namespace.magic, self.schema_version) {
            Ok(value) => Some(value),
            Err(CacheError::SchemaMismatch { found, expected }) => {
                tracing::debug!(
                    path = %path.display(),
                    found,
                    expected,
                    "L2 schema mismatch, deleting entry"
                );
                self.metrics.schema_mismatches.inc();
                let _ = fs::remove_file(&path);
                None
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "L2 corrupt entry, deleting");
                self.metrics.corrupt_entries.inc();
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    /// Write a record. Returns `true` when a new file was committed.
    pub fn set<V: Serialize>(&self, key: &Hash128, value: &V) -> bool {
        let path = self.entry_path(key);
        if path.exists() {
            // Write-once: content-addressed keys make the committed record
            // as good as ours.
            return false;
        }

        let bytes = match encode_record(self.namespace.magic, self.schema_version, value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(key = %key.to_hex(), %err, "L2 encode failed");
                self.metrics.write_fails.inc();
                return false;
            }
        };

        match self.write_atomic(&path, &bytes) {
            Ok(()) => true,
            Err(err) => {
                if err.kind() == ErrorKind::StorageFull {
                    self.metrics.disk_full_errors.inc();
                } else {
                    self.metrics.write_fails.inc();
                }
                tracing::warn!(path = %path.display(), %err, "L2 write failed, continuing");
                false
            }
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp.{}.{}", process::id(), seq));
        {
            let mut file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        match fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                Err(err)
            }
        }
    }

    pub fn invalidate(&self, key: &Hash128) {
        let path = self.entry_path(key);
        if path.exists() {
            let _ = fs::remove_file(&path);
        }
    }

    /// Remove entries whose key matches the predicate.
    pub fn invalidate_matching(&self, mut pred: impl FnMut(&Hash128) -> bool) {
        for key in self.keys() {
            if pred(&key) {
                self.invalidate(&key);
            }
        }
    }

    /// Keys of committed entries (directory scan).
    pub fn keys(&self) -> Vec<Hash128> {
        let mut keys = Vec::new();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return keys;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.namespace.ext) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(key) = Hash128::from_hex(stem) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> std::io::Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn read_all(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        // Absent file is an ordinary miss, not a transient failure.
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        id: u64,
        body: String,
    }

    fn cache(tmp: &TempDir) -> DiskCache {
        let metrics = Arc::new(TieredCacheMetrics::new("l2test", &Registry::new()));
        DiskCache::new(tmp.path(), SEMANTIC_NS, "0.1.0", 1, metrics).unwrap()
    }

    fn key(n: u8) -> Hash128 {
        Hash128::compute(&[n])
    }

    #[test]
    fn test_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let value = Payload {
            id: 7,
            body: "x".repeat(100),
        };
        assert!(cache.set(&key(1), &value));
        assert_eq!(cache.get::<Payload>(&key(1)).unwrap(), value);
    }

    #[test]
    fn test_version_isolated_directory() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let expected = tmp.path().join("semantic").join("0.1.0").join("1");
        assert_eq!(cache.dir(), expected.as_path());
    }

    #[test]
    fn test_miss_on_absent_key() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        assert!(cache.get::<Payload>(&key(9)).is_none());
    }

    #[test]
    fn test_write_once_skips_committed() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let value = Payload {
            id: 1,
            body: "v1".into(),
        };
        assert!(cache.set(&key(1), &value));
        assert!(!cache.set(&key(1), &value));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_no_tmp_files_after_write() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        cache.set(
            &key(1),
            &Payload {
                id: 1,
                body: "v".into(),
            },
        );
        let leftovers: Vec<_> = fs::read_dir(cache.dir())
            .unwrap()
            .flatten()
            .filter(|e| {
                e.path()
                    .to_string_lossy()
                    .contains(".tmp")
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_entry_deleted_and_missed() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let value = Payload {
            id: 3,
            body: "payload".into(),
        };
        cache.set(&key(3), &value);

        // Flip one byte of the payload.
        let path = cache.entry_path(&key(3));
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(cache.get::<Payload>(&key(3)).is_none());
        assert!(!path.exists(), "corrupt entry must be deleted");
        assert_eq!(cache.metrics.corrupt_entries.get(), 1);

        // Rebuild path: a fresh write commits again.
        assert!(cache.set(&key(3), &value));
        assert!(cache.get::<Payload>(&key(3)).is_some());
    }

    #[test]
    fn test_schema_mismatch_deleted() {
        let tmp = TempDir::new().unwrap();
        let metrics = Arc::new(TieredCacheMetrics::new("l2schema", &Registry::new()));
        let v1 = DiskCache::new(tmp.path(), SEMANTIC_NS, "0.1.0", 1, metrics.clone()).unwrap();
        let value = Payload {
            id: 1,
            body: "v".into(),
        };
        v1.set(&key(1), &value);

        // Reader expecting schema 2 over the same directory: copy the v1
        // record in place so paths match.
        let v2 = DiskCache::new(tmp.path(), SEMANTIC_NS, "0.1.0", 2, metrics.clone()).unwrap();
        fs::copy(v1.entry_path(&key(1)), v2.entry_path(&key(1))).unwrap();

        assert!(v2.get::<Payload>(&key(1)).is_none());
        assert!(!v2.entry_path(&key(1)).exists());
        assert_eq!(metrics.schema_mismatches.get(), 1);
    }

    #[test]
    fn test_keys_sorted() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        for n in [5u8, 1, 9] {
            cache.set(
                &key(n),
                &Payload {
                    id: n as u64,
                    body: String::new(),
                },
            );
        }
        let keys = cache.keys();
        assert_eq!(keys.len(), 3);
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_concurrent_writers_single_committed_record() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(cache(&tmp));
        let k = key(42);

        std::thread::scope(|scope| {
            for i in 0..16 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    cache.set(
                        &k,
                        &Payload {
                            id: 42,
                            body: format!("writer-{i}"),
                        },
                    );
                });
            }
        });

        assert_eq!(cache.len(), 1);
        // The committed record decodes cleanly whoever won.
        assert!(cache.get::<Payload>(&k).is_some());
    }
}

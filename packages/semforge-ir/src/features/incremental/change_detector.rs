//! Change detection between a prior snapshot and the requested file set.
//!
//! Fast path first: matching mtime + size means unchanged without reading
//! content. On mismatch the content hash decides; a touch without an edit
//! is reported through `touched` so callers can promote L0 metadata.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::features::cache::{CacheResult, ContentHash, FileId, FileMetadata};

/// One requested source file with the stat data the caller's walker saw.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub bytes: Arc<Vec<u8>>,
    pub mtime_ns: u64,
    pub size_bytes: u64,
}

impl SourceFile {
    pub fn new(id: FileId, bytes: impl Into<Vec<u8>>, mtime_ns: u64) -> Self {
        let bytes = bytes.into();
        let size_bytes = bytes.len() as u64;
        Self {
            id,
            bytes: Arc::new(bytes),
            mtime_ns,
            size_bytes,
        }
    }

    pub fn from_path(id: FileId, path: impl AsRef<Path>) -> CacheResult<Self> {
        let (meta, bytes) = FileMetadata::from_path(path)?;
        Ok(Self {
            id,
            bytes: Arc::new(bytes),
            mtime_ns: meta.mtime_ns,
            size_bytes: meta.size_bytes,
        })
    }

    pub fn content_hash(&self) -> ContentHash {
        ContentHash::compute(&self.bytes)
    }

    pub fn metadata(&self) -> FileMetadata {
        FileMetadata::new(self.mtime_ns, self.size_bytes, self.content_hash())
    }
}

/// Added / modified / deleted files, all sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<FileId>,
    pub modified: Vec<FileId>,
    pub deleted: Vec<FileId>,
    /// mtime changed but content identical; metadata should be promoted.
    pub touched: Vec<FileId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Added + modified, sorted.
    pub fn changed(&self) -> Vec<FileId> {
        let mut changed: Vec<FileId> = self
            .added
            .iter()
            .chain(self.modified.iter())
            .cloned()
            .collect();
        changed.sort();
        changed
    }
}

/// Diff the requested set against prior snapshot metadata.
pub fn detect_changes(
    prior: &BTreeMap<FileId, FileMetadata>,
    request: &[SourceFile],
) -> ChangeSet {
    let mut change_set = ChangeSet::default();

    for file in request {
        match prior.get(&file.id) {
            None => change_set.added.push(file.id.clone()),
            Some(meta) => {
                if meta.matches_fast(file.mtime_ns, file.size_bytes) {
                    continue;
                }
                // Stat mismatch: hash decides.
                if meta.content_hash == file.content_hash() {
                    change_set.touched.push(file.id.clone());
                } else {
                    change_set.modified.push(file.id.clone());
                }
            }
        }
    }

    let requested: std::collections::BTreeSet<&FileId> = request.iter().map(|f| &f.id).collect();
    for file_id in prior.keys() {
        if !requested.contains(file_id) {
            change_set.deleted.push(file_id.clone());
        }
    }

    change_set.added.sort();
    change_set.modified.sort();
    change_set.deleted.sort();
    change_set.touched.sort();
    change_set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, content: &str, mtime: u64) -> SourceFile {
        SourceFile::new(FileId::new(path), content.as_bytes().to_vec(), mtime)
    }

    fn prior_of(files: &[&SourceFile]) -> BTreeMap<FileId, FileMetadata> {
        files
            .iter()
            .map(|f| (f.id.clone(), f.metadata()))
            .collect()
    }

    #[test]
    fn test_no_changes() {
        let a = source("a.py", "x = 1", 100);
        let prior = prior_of(&[&a]);
        let changes = detect_changes(&prior, &[a.clone()]);
        assert!(changes.is_empty());
        assert!(changes.touched.is_empty());
    }

    #[test]
    fn test_added_modified_deleted() {
        let a = source("a.py", "x = 1", 100);
        let b = source("b.py", "y = 2", 100);
        let prior = prior_of(&[&a, &b]);

        let a_edited = source("a.py", "x = 99", 200);
        let c = source("c.py", "z = 3", 100);
        let changes = detect_changes(&prior, &[a_edited, c]);

        assert_eq!(changes.added, vec![FileId::new("c.py")]);
        assert_eq!(changes.modified, vec![FileId::new("a.py")]);
        assert_eq!(changes.deleted, vec![FileId::new("b.py")]);
    }

    #[test]
    fn test_touch_without_edit_is_not_modified() {
        let a = source("a.py", "x = 1", 100);
        let prior = prior_of(&[&a]);

        let a_touched = source("a.py", "x = 1", 999);
        let changes = detect_changes(&prior, &[a_touched]);
        assert!(changes.is_empty());
        assert_eq!(changes.touched, vec![FileId::new("a.py")]);
    }
}

//! Path-keyed catalog of candidate files.
//!
//! The catalog is built once by the inventory walk and then mutated in place
//! by the dedup engine: digests are cached on first use and records of
//! replaced paths are refreshed after linking. Records are never removed.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::FileRecord;

/// Order two paths by their raw string bytes.
///
/// Unlike `Path`'s component-wise `Ord`, this puts `a.txt` before `a/x`
/// because `.` sorts below the separator.
#[must_use]
pub fn path_order(a: &Path, b: &Path) -> Ordering {
    a.as_os_str()
        .as_encoded_bytes()
        .cmp(b.as_os_str().as_encoded_bytes())
}

/// Mapping from path to [`FileRecord`] across all walked roots.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: HashMap<PathBuf, FileRecord>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record keyed by its path, returning any record it replaced.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.path.clone(), record)
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut FileRecord> {
        self.records.get_mut(path)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All paths in lexicographic order of their string form.
    ///
    /// This order fixes iteration for the engine, and makes the first path of
    /// any identical group the surviving canonical copy.
    #[must_use]
    pub fn sorted_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.records.keys().cloned().collect();
        paths.sort_by(|a, b| path_order(a, b));
        paths
    }

    /// Iterate over records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Total size of all cataloged files in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.values().map(|r| r.size).sum()
    }
}

impl FromIterator<FileRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

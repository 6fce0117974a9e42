//! Candidate grouping by (device, size).
//!
//! # Overview
//!
//! Two files can only be linked if they are the same size and live on the same
//! device. Grouping on that key is a metadata-only pre-filter: files with a
//! unique key, and all empty files, never reach the hashing stage.
//!
//! Within a group, paths are kept in lexicographic order so the first path of
//! any set of identical files becomes the canonical copy. Groups themselves are
//! ordered by their first path.
//!
//! # Example
//!
//! ```
//! use hardlinker::dedup::group_by_device_and_size;
//! use hardlinker::scanner::{Catalog, FileIdentity, FileRecord};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let catalog: Catalog = vec![
//!     FileRecord::new(PathBuf::from("/a"), FileIdentity::new(1, 1), 100, SystemTime::UNIX_EPOCH),
//!     FileRecord::new(PathBuf::from("/b"), FileIdentity::new(1, 2), 100, SystemTime::UNIX_EPOCH),
//!     FileRecord::new(PathBuf::from("/c"), FileIdentity::new(1, 3), 200, SystemTime::UNIX_EPOCH),
//! ]
//! .into_iter()
//! .collect();
//!
//! let (groups, stats) = group_by_device_and_size(&catalog);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
//! assert_eq!(stats.eliminated_unique, 1);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::scanner::{path_order, Catalog};

/// Grouping key: files can only be linked within one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    /// Device the files live on
    pub device: u64,
    /// File size in bytes
    pub size: u64,
}

/// A set of same-device, same-size paths in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGroup {
    /// Shared key
    pub key: GroupKey,
    /// Member paths, sorted
    pub paths: Vec<PathBuf>,
}

impl CandidateGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Statistics from the grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Files in the catalog
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Zero-length files (never linked)
    pub empty_files: usize,
    /// Distinct (device, size) keys among non-empty files
    pub unique_keys: usize,
    /// Files eliminated because their key is unique
    pub eliminated_unique: usize,
    /// Files left in groups of two or more
    pub potential_duplicates: usize,
    /// Groups of two or more
    pub candidate_groups: usize,
}

/// Group catalog paths by (device, size), dropping empty files and singletons.
#[must_use]
pub fn group_by_device_and_size(catalog: &Catalog) -> (Vec<CandidateGroup>, GroupingStats) {
    let mut all_groups: HashMap<GroupKey, Vec<PathBuf>> = HashMap::new();
    let mut stats = GroupingStats::default();

    // sorted_paths() keeps every group's members in lexicographic order
    for path in catalog.sorted_paths() {
        let Some(record) = catalog.get(&path) else {
            continue;
        };
        stats.total_files += 1;
        stats.total_size += record.size;

        if record.size == 0 {
            stats.empty_files += 1;
            log::trace!("Empty file never linked: {}", path.display());
            continue;
        }

        let key = GroupKey {
            device: record.identity.device,
            size: record.size,
        };
        all_groups.entry(key).or_default().push(path);
    }

    stats.unique_keys = all_groups.len();

    let mut groups: Vec<CandidateGroup> = all_groups
        .into_iter()
        .filter_map(|(key, paths)| {
            if paths.len() < 2 {
                stats.eliminated_unique += paths.len();
                None
            } else {
                stats.potential_duplicates += paths.len();
                Some(CandidateGroup { key, paths })
            }
        })
        .collect();
    groups.sort_by(|a, b| path_order(&a.paths[0], &b.paths[0]));
    stats.candidate_groups = groups.len();

    log::debug!(
        "Grouping: {} files, {} empty, {} unique, {} potential duplicates in {} groups",
        stats.total_files,
        stats.empty_files,
        stats.eliminated_unique,
        stats.potential_duplicates,
        stats.candidate_groups
    );

    (groups, stats)
}

//! Duplicate detection and hardlink replacement.
//!
//! # Pipeline
//!
//! 1. **Grouping** - Bucket catalog paths by (device, size); drop empty files and singletons
//! 2. **Comparison** - Within a group, hash lazily and compare each later path to each earlier one
//! 3. **Linking** - Replace confirmed duplicates with hardlinks to the lexicographically first path
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::dedup::{DedupConfig, Deduplicator};
//! use hardlinker::scanner::WalkerConfig;
//! use std::path::PathBuf;
//!
//! let dedup = Deduplicator::new(DedupConfig::default());
//! let (_, summary) = dedup
//!     .dedup_paths(&[PathBuf::from("/data")], WalkerConfig::default())
//!     .unwrap();
//! println!("reduced {}", summary.reduced);
//! ```

pub mod engine;
pub mod groups;

pub use engine::{
    DedupConfig, DedupError, DedupSummary, Deduplicator, HashFailure, LinkFailure,
};
pub use groups::{group_by_device_and_size, CandidateGroup, GroupKey, GroupingStats};

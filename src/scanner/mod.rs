//! Scanner module for inventory building and content hashing.
//!
//! This module provides functionality for:
//! - Single-threaded directory walking using walkdir
//! - Filesystem identity extraction (device, inode)
//! - Streaming SHA-512 content hashing
//! - The path-keyed [`Catalog`] of candidate files
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal, exclusion filtering and catalog building
//! - [`identity`]: Platform (device, inode) identity
//! - [`hasher`]: SHA-512 file hashing (streaming)
//! - [`catalog`]: Path to [`FileRecord`] mapping
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::scanner::{InventoryBuilder, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let builder = InventoryBuilder::new(WalkerConfig::default());
//! let (catalog, stats) = builder.build(&[PathBuf::from(".")]).unwrap();
//! println!("Collected {} files ({} excluded)", catalog.len(), stats.excluded);
//! ```

pub mod catalog;
pub mod hasher;
pub mod identity;
pub mod walker;

use std::fs::Metadata;
use std::path::PathBuf;
use std::time::SystemTime;

use regex::Regex;

// Re-export main types
pub use catalog::{path_order, Catalog};
pub use hasher::{hash_to_hex, Hash, Hasher, HASH_BUFFER_SIZE};
pub use identity::FileIdentity;
pub use walker::{InventoryBuilder, InventoryStats, SkipReason, WalkItem, Walker};

/// Directory name of the Windows recycle bin. Subtrees below it are never walked.
pub const RECYCLE_BIN_MARKER: &str = "$RECYCLE.BIN";

/// One catalog entry per distinct walked path.
///
/// Only regular, non-symlink files whose filesystem reports a usable
/// (device, inode) identity become records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path as walked (absolute root joined with the relative entry path)
    pub path: PathBuf,
    /// Filesystem identity; equal identities are the same physical file
    pub identity: FileIdentity,
    /// File size in bytes at stat time
    pub size: u64,
    /// Last modification time at stat time
    pub modified: SystemTime,
    /// Content digest, computed lazily on the first same-size collision
    pub content_hash: Option<Hash>,
}

impl FileRecord {
    /// Create a record with no cached digest.
    #[must_use]
    pub fn new(path: PathBuf, identity: FileIdentity, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            identity,
            size,
            modified,
            content_hash: None,
        }
    }

    /// Build a record from `symlink_metadata` output.
    ///
    /// Returns `None` when the entry is not a regular file or the platform
    /// reports no identity for it.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Option<Self> {
        if !metadata.is_file() || metadata.file_type().is_symlink() {
            return None;
        }
        let identity = FileIdentity::from_metadata(metadata)?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(Self::new(path, identity, metadata.len(), modified))
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// File paths matching any of these (unanchored search) are never cataloged.
    pub excludes: Vec<Regex>,

    /// Directory name whose subtrees are never walked.
    pub trash_marker: String,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            excludes: Vec::new(),
            trash_marker: RECYCLE_BIN_MARKER.to_string(),
        }
    }
}

impl WalkerConfig {
    /// Set the exclusion patterns.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<Regex>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Override the trash directory marker.
    #[must_use]
    pub fn with_trash_marker(mut self, marker: impl Into<String>) -> Self {
        self.trash_marker = marker.into();
        self
    }

    /// Check whether a path string matches any exclusion pattern.
    #[must_use]
    pub fn is_excluded(&self, path: &std::path::Path) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let text = path.to_string_lossy();
        self.excludes.iter().any(|re| re.is_match(&text))
    }

    /// Check whether any component of the path is the trash marker.
    #[must_use]
    pub fn is_in_trash(&self, path: &std::path::Path) -> bool {
        path.components().any(|c| {
            c.as_os_str()
                .to_string_lossy()
                .eq_ignore_ascii_case(&self.trash_marker)
        })
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Map an I/O error on `path` to the matching variant.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Map an I/O error on `path` to the matching variant.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

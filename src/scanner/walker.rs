//! Inventory builder: directory walking into a [`Catalog`].
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing one root and the
//! [`InventoryBuilder`] that walks every requested root into a single catalog.
//! Walking is single-threaded ([`walkdir`]) so that every stat result is
//! serialized with respect to the later linking pass.
//!
//! # Features
//!
//! - Regex exclusions matched against each file's full path
//! - Recycle-bin subtrees pruned without descending
//! - Symlinks, non-regular files and files without identity are skipped
//! - Permission errors are skipped, other walk errors are surfaced
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::scanner::{Walker, WalkerConfig, WalkItem};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! for item in walker.walk() {
//!     match item {
//!         Ok(WalkItem::File(record)) => println!("{}: {} bytes", record.path.display(), record.size),
//!         Ok(WalkItem::Skipped { .. }) => {}
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use directories::BaseDirs;
use serde::Serialize;
use walkdir::WalkDir;

use super::{Catalog, FileRecord, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Why a walked entry did not become a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// File path matched an exclusion pattern
    Excluded,
    /// Directory below the recycle-bin marker
    Trash,
    /// Symbolic link
    Symlink,
    /// Not a regular file (fifo, socket, device node...)
    NotRegular,
    /// Filesystem reports a zero device or inode
    NoIdentity,
    /// Entry disappeared between listing and stat
    Vanished,
}

/// A single walk result that is not an error.
#[derive(Debug, Clone)]
pub enum WalkItem {
    /// A file eligible for deduplication
    File(FileRecord),
    /// An entry that was deliberately skipped
    Skipped {
        /// Path of the skipped entry
        path: PathBuf,
        /// Reason it was skipped
        reason: SkipReason,
    },
}

/// Directory walker for a single root.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the directory tree, including the root itself.
    ///
    /// Entries are visited in file-name order. Errors are yielded as
    /// [`ScanError`] values rather than stopping iteration.
    pub fn walk(&self) -> Walk<'_> {
        let inner = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Walk {
            walker: self,
            inner,
        }
    }

    /// Classify a non-directory entry, stat'ing it without following symlinks.
    fn classify_file(&self, path: &Path, is_symlink: bool) -> Result<WalkItem, ScanError> {
        if self.config.is_excluded(path) {
            return Ok(skipped(path, SkipReason::Excluded));
        }
        if is_symlink {
            return Ok(skipped(path, SkipReason::Symlink));
        }

        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("File vanished during walk: {}", path.display());
                return Ok(skipped(path, SkipReason::Vanished));
            }
            Err(e) => return Err(ScanError::from_io(path, e)),
        };

        if !metadata.is_file() {
            return Ok(skipped(path, SkipReason::NotRegular));
        }

        match FileRecord::from_metadata(path.to_path_buf(), &metadata) {
            Some(record) => Ok(WalkItem::File(record)),
            None => Ok(skipped(path, SkipReason::NoIdentity)),
        }
    }

    /// Convert a walkdir error, keeping the offending path.
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        match error.into_io_error() {
            Some(io) => ScanError::from_io(&path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            },
        }
    }
}

fn skipped(path: &Path, reason: SkipReason) -> WalkItem {
    WalkItem::Skipped {
        path: path.to_path_buf(),
        reason,
    }
}

/// Iterator returned by [`Walker::walk`].
pub struct Walk<'a> {
    walker: &'a Walker,
    inner: walkdir::IntoIter,
}

impl Iterator for Walk<'_> {
    type Item = Result<WalkItem, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.walker.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(self.walker.handle_walk_error(e))),
            };
            let path = entry.path();
            let file_type = entry.file_type();

            // Exclusions apply to file paths only; a directory matching a
            // pattern may still hold files that do not.
            if file_type.is_dir() {
                if self.walker.config.is_in_trash(path) {
                    log::trace!("Pruning trash directory: {}", path.display());
                    self.inner.skip_current_dir();
                    return Some(Ok(skipped(path, SkipReason::Trash)));
                }
                continue;
            }

            return Some(self.walker.classify_file(path, file_type.is_symlink()));
        }
    }
}

/// Counters collected while building the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    /// Records added to the catalog
    pub files: usize,
    /// Files or symlinks whose path matched an exclusion
    pub excluded: usize,
    /// Recycle-bin directories pruned
    pub trash_pruned: usize,
    /// Symbolic links skipped
    pub symlinks: usize,
    /// Non-regular files skipped
    pub not_regular: usize,
    /// Files without a usable device/inode skipped
    pub no_identity: usize,
    /// Entries that vanished during the walk
    pub vanished: usize,
    /// Entries skipped because of permission errors
    pub permission_denied: usize,
}

impl InventoryStats {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Excluded => self.excluded += 1,
            SkipReason::Trash => self.trash_pruned += 1,
            SkipReason::Symlink => self.symlinks += 1,
            SkipReason::NotRegular => self.not_regular += 1,
            SkipReason::NoIdentity => self.no_identity += 1,
            SkipReason::Vanished => self.vanished += 1,
        }
    }
}

/// Walks every requested root into one [`Catalog`].
#[derive(Clone, Default)]
pub struct InventoryBuilder {
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for InventoryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryBuilder")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl InventoryBuilder {
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Walk all roots and collect their files.
    ///
    /// Overlapping roots are harmless: records are keyed by path.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a root does not exist
    /// - `Io` for any walk or stat failure other than permission denied
    pub fn build(&self, roots: &[PathBuf]) -> Result<(Catalog, InventoryStats), ScanError> {
        let mut catalog = Catalog::new();
        let mut stats = InventoryStats::default();

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_start("walking", 0);
        }
        let result = self.walk_roots(roots, &mut catalog, &mut stats);
        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_end("walking");
        }
        result?;

        stats.files = catalog.len();
        log::info!("Collected {} files", catalog.len());
        Ok((catalog, stats))
    }

    fn walk_roots(
        &self,
        roots: &[PathBuf],
        catalog: &mut Catalog,
        stats: &mut InventoryStats,
    ) -> Result<(), ScanError> {
        for root in roots {
            let root = prepare_root(root)?;
            log::debug!("Walking {}", root.display());

            let mut walker = Walker::new(&root, self.config.clone());
            if let Some(ref flag) = self.shutdown_flag {
                walker = walker.with_shutdown_flag(Arc::clone(flag));
            }

            for item in walker.walk() {
                match item {
                    Ok(WalkItem::File(record)) => {
                        if let Some(ref cb) = self.progress_callback {
                            cb.on_progress(catalog.len() + 1, &record.path.to_string_lossy());
                        }
                        catalog.insert(record);
                    }
                    Ok(WalkItem::Skipped { path, reason }) => {
                        log::trace!("Skipping {} ({:?})", path.display(), reason);
                        stats.record_skip(reason);
                    }
                    Err(ScanError::PermissionDenied(path)) => {
                        log::debug!("Permission denied, skipping: {}", path.display());
                        stats.permission_denied += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}

/// Expand a leading `~`, make the root absolute and check it exists.
///
/// # Errors
///
/// Returns `NotFound` (or another mapped I/O error) if the root cannot be stat'd.
pub fn prepare_root(root: &Path) -> Result<PathBuf, ScanError> {
    let expanded = expand_home(root);
    let absolute = std::path::absolute(&expanded).map_err(|e| ScanError::from_io(&expanded, e))?;
    std::fs::symlink_metadata(&absolute).map_err(|e| ScanError::from_io(&absolute, e))?;
    Ok(absolute)
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

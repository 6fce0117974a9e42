//! Replacing a duplicate path with a hardlink to the canonical file.
//!
//! # Overview
//!
//! The engine consumes hardlink creation as a capability through the
//! [`Linker`] trait. [`FsLinker`] is the real implementation:
//!
//! 1. Verify the target still matches what the inventory saw (TOCTOU check)
//! 2. Create a hardlink to the source under a temporary sibling name
//! 3. Rename the temporary over the target
//!
//! The rename replaces the old directory entry in one step. If any step fails
//! the temporary is removed and the target keeps its original content.
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::actions::link::{FileSnapshot, FsLinker, Linker};
//! use std::path::Path;
//!
//! let target = Path::new("/data/copy.bin");
//! let snapshot = FileSnapshot::capture(target).unwrap();
//! match FsLinker.replace_with_link(Path::new("/data/original.bin"), &snapshot) {
//!     Ok(()) => println!("Linked {}", target.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::scanner::{FileIdentity, FileRecord};

/// How many temporary names to try before giving up.
const TEMP_NAME_ATTEMPTS: u32 = 16;

/// Error type for link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Target was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when inspecting or replacing the target.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Target was modified or replaced since the inventory walk.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Creating the hardlink to the source failed.
    #[error("cannot link {src} next to {path}: {source}")]
    LinkFailed {
        src: PathBuf,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving the new link over the target failed.
    #[error("cannot replace {path}: {source}")]
    ReplaceFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// Get the target path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::LinkFailed { path: p, .. }
            | Self::ReplaceFailed { path: p, .. } => p,
        }
    }

    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::ReplaceFailed {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// State of a file at inventory time, used to detect changes before replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// File path
    pub path: PathBuf,
    /// Identity at inventory time
    pub identity: Option<FileIdentity>,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Snapshot the current on-disk state of a path (not following symlinks).
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, LinkError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| LinkError::from_io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            identity: FileIdentity::from_metadata(&metadata),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Snapshot what the catalog recorded for a file.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            identity: Some(record.identity),
            size: record.size,
            mtime: Some(record.modified),
        }
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the file was modified, replaced, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), LinkError> {
        let current = Self::capture(&self.path)?;

        if self.identity != current.identity {
            log::warn!(
                "File replaced since scan: {} (identity changed)",
                self.path.display()
            );
            return Err(LinkError::Modified(self.path.clone()));
        }

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(LinkError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(LinkError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Hardlink replacement capability used by the dedup engine.
pub trait Linker {
    /// Replace `target.path` with a hardlink to `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the target changed or any filesystem step failed.
    /// On error the target must be left as it was whenever possible.
    fn replace_with_link(&self, source: &Path, target: &FileSnapshot) -> Result<(), LinkError>;
}

/// [`Linker`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLinker;

impl Linker for FsLinker {
    fn replace_with_link(&self, source: &Path, target: &FileSnapshot) -> Result<(), LinkError> {
        target.verify()?;

        let temp = create_temp_link(source, &target.path)?;

        if let Err(e) = fs::rename(&temp, &target.path) {
            log::error!("Replace failed for {}: {}", target.path.display(), e);
            if let Err(cleanup) = fs::remove_file(&temp) {
                log::warn!(
                    "Could not remove temporary link {}: {}",
                    temp.display(),
                    cleanup
                );
            }
            return Err(LinkError::ReplaceFailed {
                path: target.path.clone(),
                source: e,
            });
        }

        log::trace!("Replaced {} with link to {}", target.path.display(), source.display());
        Ok(())
    }
}

/// Hardlink `source` to a fresh temporary name in the target's directory.
fn create_temp_link(source: &Path, target: &Path) -> Result<PathBuf, LinkError> {
    let mut last_error = None;
    for attempt in 0..TEMP_NAME_ATTEMPTS {
        let temp = temp_sibling(target, attempt);
        match fs::hard_link(source, &temp) {
            Ok(()) => return Ok(temp),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_error = Some(e),
            Err(e) => {
                return Err(LinkError::LinkFailed {
                    src: source.to_path_buf(),
                    path: target.to_path_buf(),
                    source: e,
                })
            }
        }
    }
    Err(LinkError::LinkFailed {
        src: source.to_path_buf(),
        path: target.to_path_buf(),
        source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)),
    })
}

/// `dir/.name.hardlinker-<pid>-<n>.tmp` next to `target`.
fn temp_sibling(target: &Path, attempt: u32) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(format!(".hardlinker-{}-{}.tmp", std::process::id(), attempt));
    target.with_file_name(name)
}

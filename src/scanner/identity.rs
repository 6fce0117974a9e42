//! Filesystem identity of physical files.
//!
//! # Overview
//!
//! Hardlinks are multiple directory entries pointing to the same inode on disk.
//! Two paths with the same (device, inode) pair are the same physical file and
//! never need linking; paths on different devices can never be linked.
//!
//! # Platform Support
//!
//! - **Unix**: Uses (device_id, inode) pairs from file metadata
//! - **Other**: No identity is reported, so no file is ever considered for linking
//!
//! Some virtual and network filesystems report a zero device or inode. Such
//! files are treated as having no identity at all.
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::scanner::FileIdentity;
//! use std::path::Path;
//!
//! if let Ok(Some(id)) = FileIdentity::probe(Path::new("/some/file.txt")) {
//!     println!("device {} inode {}", id.device, id.inode);
//! }
//! ```

use std::fs::Metadata;
use std::path::Path;

use serde::Serialize;

/// (device, inode) pair identifying a physical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileIdentity {
    /// Filesystem/volume the file lives on
    pub device: u64,
    /// Inode number within that device
    pub inode: u64,
}

impl FileIdentity {
    /// Create an identity from raw values.
    #[must_use]
    pub const fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    /// Extract the identity from file metadata.
    ///
    /// Returns `None` if the platform doesn't support inode tracking or if
    /// the filesystem reports a zero device or inode.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        let (device, inode) = (metadata.dev(), metadata.ino());
        if device == 0 || inode == 0 {
            return None;
        }
        Some(Self { device, inode })
    }

    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        // std exposes no stable volume serial / file index outside Unix.
        None
    }

    /// Stat `path` without following symlinks and return its identity.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the path cannot be stat'd.
    pub fn probe(path: &Path) -> std::io::Result<Option<Self>> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(&metadata))
    }

    /// Whether both identities live on the same device.
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        self.device == other.device
    }

    /// Check if identity extraction is supported on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

impl std::fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.device, self.inode)
    }
}

//! SHA-512 file hasher with streaming support.
//!
//! # Overview
//!
//! Content identity is decided by a cryptographic digest. Files are read in
//! fixed-size chunks so memory use stays bounded regardless of file size.
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let hash = hasher.hash_file(Path::new("file.bin")).unwrap();
//! println!("{}", hash_to_hex(&hash));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha512};

use super::HashError;

/// A SHA-512 digest.
pub type Hash = [u8; 64];

/// Default read chunk size (128 KiB).
pub const HASH_BUFFER_SIZE: usize = 128 * 1024;

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default 128 KiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: HASH_BUFFER_SIZE,
        }
    }

    /// Override the read chunk size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Current read chunk size.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file disappeared since the walk
    /// - `PermissionDenied` if the file cannot be opened or read
    /// - `Io` for any other read failure
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let hash = self.hash_reader(file, path)?;
        log::trace!("Hashed {}: {}", path.display(), hash_to_hex(&hash));
        Ok(hash)
    }

    /// Hash everything readable from `reader`; `path` is used for error context.
    ///
    /// # Errors
    ///
    /// Returns a `HashError` if reading fails.
    pub fn hash_reader<R: Read>(&self, mut reader: R, path: &Path) -> Result<Hash, HashError> {
        let mut hasher = Sha512::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
        }

        let digest = hasher.finalize();
        let mut hash = [0u8; 64];
        hash.copy_from_slice(&digest);
        Ok(hash)
    }
}

/// Render a digest as lowercase hexadecimal (128 characters).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;
    hash.iter().fold(String::with_capacity(128), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

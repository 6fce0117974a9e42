//! File actions module.
//!
//! This module provides the one filesystem mutation the tool performs:
//! replacing a duplicate path with a hardlink to its canonical copy.
//!
//! ```no_run
//! use hardlinker::actions::{FileSnapshot, FsLinker, Linker};
//! use std::path::Path;
//!
//! let snapshot = FileSnapshot::capture(Path::new("b.txt")).unwrap();
//! FsLinker.replace_with_link(Path::new("a.txt"), &snapshot).unwrap();
//! ```

pub mod link;

// Re-export commonly used types
pub use link::{FileSnapshot, FsLinker, LinkError, Linker};

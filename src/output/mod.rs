//! Run report formatters.
//!
//! - Text for people (default)
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::dedup::Deduplicator;
//! use hardlinker::output::TextOutput;
//! use hardlinker::scanner::WalkerConfig;
//! use std::path::PathBuf;
//!
//! let (_, summary) = Deduplicator::with_defaults()
//!     .dedup_paths(&[PathBuf::from(".")], WalkerConfig::default())
//!     .unwrap();
//! TextOutput::new(&summary).write_to(std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;

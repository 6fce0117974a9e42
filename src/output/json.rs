//! JSON run report.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "roots": ["/data/photos"],
//!   "summary": {
//!     "files_collected": 1532,
//!     "comparisons": 40,
//!     "files_hashed": 52,
//!     "bytes_hashed": 9437184,
//!     "files_linked": 12,
//!     "reduced": 48213,
//!     "reduced_human": "47.1 KiB",
//!     "unlinked": 0,
//!     "reclaimed": 48213,
//!     "simulated": false,
//!     "duration_ms": 311,
//!     "exit_code": 0,
//!     "exit_code_name": "HL000"
//!   },
//!   "inventory": { "files": 1532, "excluded": 4, "...": 0 },
//!   "grouping": { "candidate_groups": 9, "...": 0 },
//!   "hash_failures": [],
//!   "link_failures": []
//! }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::dedup::Deduplicator;
//! use hardlinker::error::ExitCode;
//! use hardlinker::output::json::JsonOutput;
//! use hardlinker::scanner::WalkerConfig;
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from(".")];
//! let (_, summary) = Deduplicator::with_defaults()
//!     .dedup_paths(&roots, WalkerConfig::default())
//!     .unwrap();
//!
//! let output = JsonOutput::new(&roots, &summary, ExitCode::Success);
//! output.write_to(&mut std::io::stdout(), true).unwrap();
//! ```

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::dedup::{DedupSummary, GroupingStats, HashFailure, LinkFailure};
use crate::error::ExitCode;
use crate::scanner::InventoryStats;

/// Headline numbers of a run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Regular files recorded by the inventory walk
    pub files_collected: usize,
    /// Content comparisons performed
    pub comparisons: usize,
    /// Files whose content was read
    pub files_hashed: usize,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Paths replaced by a hardlink (or that would be)
    pub files_linked: usize,
    /// Bytes of confirmed duplicates, counted when the digests match
    pub reduced: u64,
    /// `reduced` formatted for humans
    pub reduced_human: String,
    /// Part of `reduced` whose link failed
    pub unlinked: u64,
    /// Bytes actually reclaimed (or reclaimable): `reduced - unlinked`
    pub reclaimed: u64,
    /// Whether the filesystem was left untouched
    pub simulated: bool,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "HL000")
    pub exit_code_name: String,
}

impl JsonSummary {
    #[must_use]
    pub fn from_dedup_summary(summary: &DedupSummary, exit_code: ExitCode) -> Self {
        Self {
            files_collected: summary.inventory.files,
            comparisons: summary.comparisons,
            files_hashed: summary.files_hashed,
            bytes_hashed: summary.bytes_hashed,
            files_linked: summary.files_linked,
            reduced: summary.reduced,
            reduced_human: summary.reduced_display(),
            unlinked: summary.unlinked,
            reclaimed: summary.reclaimed(),
            simulated: summary.simulated,
            duration_ms: summary.duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Roots as given on the command line
    pub roots: Vec<String>,
    pub summary: JsonSummary,
    pub inventory: InventoryStats,
    pub grouping: GroupingStats,
    pub hash_failures: Vec<HashFailure>,
    pub link_failures: Vec<LinkFailure>,
}

impl JsonOutput {
    /// Build the report for a finished run.
    ///
    /// ```
    /// use hardlinker::dedup::DedupSummary;
    /// use hardlinker::error::ExitCode;
    /// use hardlinker::output::json::JsonOutput;
    /// use std::path::PathBuf;
    ///
    /// let summary = DedupSummary { reduced: 5, ..Default::default() };
    /// let output = JsonOutput::new(&[PathBuf::from("/d")], &summary, ExitCode::Success);
    /// assert_eq!(output.summary.reduced, 5);
    /// assert_eq!(output.roots, vec!["/d".to_string()]);
    /// ```
    #[must_use]
    pub fn new(roots: &[PathBuf], summary: &DedupSummary, exit_code: ExitCode) -> Self {
        Self {
            roots: roots
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            summary: JsonSummary::from_dedup_summary(summary, exit_code),
            inventory: summary.inventory.clone(),
            grouping: summary.grouping.clone(),
            hash_failures: summary.hash_failures.clone(),
            link_failures: summary.link_failures.clone(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

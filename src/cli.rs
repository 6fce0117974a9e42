//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Link duplicates below the current directory
//! hardlinker
//!
//! # Dry run over two trees, showing every link that would be made
//! hardlinker --simulate -v ~/photos /mnt/backup/photos
//!
//! # Skip Python sources, report as JSON
//! hardlinker --exclude='\.py$' --output json ~/src
//! ```

use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::PathBuf;

/// Replace byte-identical files with hardlinks to a single canonical copy.
///
/// The lexicographically first path of each set of identical files is kept;
/// every other path is atomically replaced by a hardlink to it. Files on
/// different devices and empty files are never linked.
#[derive(Debug, Parser)]
#[command(name = "hardlinker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories (or files) to deduplicate
    #[arg(value_name = "ROOT", default_value = ".")]
    pub roots: Vec<PathBuf>,

    /// Report what would be linked without touching the filesystem
    #[arg(short, long)]
    pub simulate: bool,

    /// Increase verbosity (-v links, -vv comparisons, -vvv everything)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Regular expression of paths to skip (can be specified multiple times)
    ///
    /// Matched anywhere in each file's full path. Directories are always descended into,
    /// so a directory name is excluded only through the file paths below it.
    #[arg(long = "exclude", value_name = "REGEX", value_parser = parse_regex)]
    pub excludes: Vec<Regex>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Print fatal errors as a JSON object on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Compile an exclusion pattern.
///
/// ```
/// use hardlinker::cli::parse_regex;
///
/// assert!(parse_regex(r"\.py$").unwrap().is_match("/src/app.py"));
/// assert!(parse_regex("(").is_err());
/// ```
///
/// # Errors
///
/// Returns the regex compiler's message if the pattern is invalid.
pub fn parse_regex(s: &str) -> Result<Regex, String> {
    Regex::new(s).map_err(|e| format!("Invalid regular expression '{s}': {e}"))
}

//! Human-readable run summary.
//!
//! ```text
//! Collected 1532 files
//! Linked 12 files, reduced 48213 bytes (47.1 KiB)
//! 1 file could not be hashed
//! ```
//!
//! In simulate mode the second line reads `Would link ...` and the report is
//! prefixed with `[simulate]`. Failure lines name each path so the user can
//! follow up; they are omitted when nothing failed.

use std::io::{self, Write};

use crate::dedup::DedupSummary;

/// Text report writer.
pub struct TextOutput<'a> {
    summary: &'a DedupSummary,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(summary: &'a DedupSummary) -> Self {
        Self { summary }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let s = self.summary;
        let marker = if s.simulated { "[simulate] " } else { "" };

        writeln!(writer, "{}Collected {} files", marker, s.inventory.files)?;
        writeln!(
            writer,
            "{}{} {}, reduced {} bytes ({})",
            marker,
            if s.simulated { "Would link" } else { "Linked" },
            plural(s.files_linked, "file"),
            s.reduced,
            s.reduced_display()
        )?;

        if !s.hash_failures.is_empty() {
            writeln!(
                writer,
                "{} could not be hashed",
                plural(s.hash_failures.len(), "file")
            )?;
            for failure in &s.hash_failures {
                writeln!(writer, "  {}: {}", failure.path.display(), failure.message)?;
            }
        }
        if !s.link_failures.is_empty() {
            writeln!(
                writer,
                "{} could not be replaced",
                plural(s.link_failures.len(), "file")
            )?;
            for failure in &s.link_failures {
                writeln!(writer, "  {}: {}", failure.target.display(), failure.message)?;
            }
            if s.unlinked > 0 {
                writeln!(
                    writer,
                    "{} bytes of the reduction not reclaimed, {} bytes reclaimed",
                    s.unlinked,
                    s.reclaimed()
                )?;
            }
        }
        Ok(())
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

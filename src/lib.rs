//! hardlinker - hardlink-based file deduplication
//!
//! Walks one or more directory trees, finds byte-identical regular files on
//! the same device (SHA-512 of the full content), and replaces every copy but
//! the lexicographically first with a hardlink to it.

pub mod actions;
pub mod cli;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::dedup::{DedupConfig, Deduplicator};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::WalkerConfig;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error if a root cannot be walked, the run is interrupted
/// ([`dedup::DedupError::Interrupted`]), or the report cannot be written.
/// Per-file hash and link failures are reported, not returned.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let handler = signal::install_handler().context("Cannot install Ctrl+C handler")?;

    let walker_config = WalkerConfig::default().with_excludes(cli.excludes.clone());
    let mut config = DedupConfig::default()
        .with_simulate(cli.simulate)
        .with_shutdown_flag(handler.get_flag());

    // Log lines already narrate progress in verbose mode
    if !cli.quiet && cli.verbose == 0 && std::io::stderr().is_terminal() {
        config = config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    if cli.simulate {
        log::info!("Simulate mode: no files will be changed");
    }

    let (_, summary) = Deduplicator::new(config).dedup_paths(&cli.roots, walker_config)?;

    let exit_code = ExitCode::Success;
    let mut stdout = std::io::stdout().lock();
    match cli.output {
        OutputFormat::Text => {
            if !cli.quiet {
                TextOutput::new(&summary)
                    .write_to(&mut stdout)
                    .context("Cannot write report")?;
            }
        }
        OutputFormat::Json => {
            JsonOutput::new(&cli.roots, &summary, exit_code)
                .write_to(&mut stdout, true)
                .context("Cannot write JSON report")?;
        }
    }

    Ok(exit_code)
}

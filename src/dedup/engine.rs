//! Dedup engine: turns confirmed duplicates into hardlinks.
//!
//! # Overview
//!
//! For every candidate group (same device, same size; see
//! [`crate::dedup::groups`]) the engine walks the members in lexicographic
//! order. Each member in turn is the *source*; every later member is compared
//! against it:
//!
//! 1. Skip if both already are the same physical file
//! 2. Skip if the candidate's inode was already proven different this round
//! 3. Hash both lazily (at most once per inode) and compare digests
//! 4. On a match, replace the candidate with a hardlink to the source and
//!    refresh its catalog record so later rounds see the merged identity
//!
//! Hash failures on the source abandon that round; hash failures on a
//! candidate skip just that candidate. Link failures are reported and the run
//! continues.
//!
//! # Example
//!
//! ```no_run
//! use hardlinker::dedup::{DedupConfig, Deduplicator};
//! use hardlinker::scanner::WalkerConfig;
//! use std::path::PathBuf;
//!
//! let dedup = Deduplicator::new(DedupConfig::default().with_simulate(true));
//! let (_catalog, summary) = dedup
//!     .dedup_paths(&[PathBuf::from(".")], WalkerConfig::default())
//!     .unwrap();
//! println!("Would reclaim {} bytes", summary.reduced);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use serde::Serialize;

use super::groups::{group_by_device_and_size, CandidateGroup, GroupingStats};
use crate::actions::{FileSnapshot, FsLinker, LinkError, Linker};
use crate::progress::ProgressCallback;
use crate::scanner::{
    Catalog, FileIdentity, FileRecord, Hash, HashError, Hasher, InventoryBuilder,
    InventoryStats, ScanError, WalkerConfig,
};

/// Configuration for a dedup run.
#[derive(Clone, Default)]
pub struct DedupConfig {
    /// Detect and account, but never touch the filesystem.
    pub simulate: bool,
    /// Content hasher.
    pub hasher: Hasher,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DedupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupConfig")
            .field("simulate", &self.simulate)
            .field("hasher", &self.hasher)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl DedupConfig {
    /// Enable or disable simulate mode.
    #[must_use]
    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Set the content hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
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

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// A file that could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashFailure {
    pub path: PathBuf,
    pub message: String,
}

/// A duplicate that could not be replaced by a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkFailure {
    /// Canonical file the link should have pointed to
    pub source: PathBuf,
    /// Path that was left as it was
    pub target: PathBuf,
    pub message: String,
}

/// Summary of a dedup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupSummary {
    /// Inventory counters (empty when only a catalog was deduplicated)
    pub inventory: InventoryStats,
    /// Grouping counters
    pub grouping: GroupingStats,
    /// Content comparisons performed
    pub comparisons: usize,
    /// Files whose content was read and hashed
    pub files_hashed: usize,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Paths replaced by a hardlink (or that would be, when simulating)
    pub files_linked: usize,
    /// Bytes of every confirmed duplicate, counted when the digests match
    pub reduced: u64,
    /// Part of `reduced` whose link then failed
    pub unlinked: u64,
    /// Whether the filesystem was left untouched
    pub simulated: bool,
    /// Files that could not be hashed
    pub hash_failures: Vec<HashFailure>,
    /// Links that could not be made
    pub link_failures: Vec<LinkFailure>,
    /// Wall time of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl DedupSummary {
    /// Reduced bytes as a human-readable string.
    #[must_use]
    pub fn reduced_display(&self) -> String {
        ByteSize::b(self.reduced).to_string()
    }

    /// Bytes actually reclaimed (or reclaimable, when simulating).
    #[must_use]
    pub fn reclaimed(&self) -> u64 {
        self.reduced.saturating_sub(self.unlinked)
    }

    /// Whether any per-file operation failed and was skipped.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.hash_failures.is_empty() || !self.link_failures.is_empty()
    }
}

/// Errors that end a dedup run.
#[derive(thiserror::Error, Debug)]
pub enum DedupError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Run interrupted by user")]
    Interrupted,

    /// The inventory walk failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// What to do after visiting one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    NextCandidate,
    AbandonSource,
}

/// Per-source bookkeeping, reset for every source file.
#[derive(Debug, Default)]
struct Round {
    /// Inodes confirmed identical to the source
    matched_ino: HashSet<u64>,
    /// Inodes confirmed different from the source
    skipped_ino: HashSet<u64>,
}

/// State that lives for one whole run.
#[derive(Debug, Default)]
struct RunState {
    summary: DedupSummary,
    digests: HashMap<FileIdentity, Hash>,
}

/// Hardlink deduplicator.
///
/// # Example
///
/// ```no_run
/// use hardlinker::dedup::Deduplicator;
/// use hardlinker::scanner::{InventoryBuilder, WalkerConfig};
/// use std::path::PathBuf;
///
/// let (mut catalog, _) = InventoryBuilder::new(WalkerConfig::default())
///     .build(&[PathBuf::from("/data")])
///     .unwrap();
/// let summary = Deduplicator::with_defaults().dedup_catalog(&mut catalog).unwrap();
/// println!("Linked {} files, reclaimed {}", summary.files_linked, summary.reduced_display());
/// ```
pub struct Deduplicator {
    config: DedupConfig,
    linker: Box<dyn Linker>,
}

impl Deduplicator {
    /// Create a deduplicator that links through the real filesystem.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            linker: Box::new(FsLinker),
        }
    }

    /// Create a deduplicator with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DedupConfig::default())
    }

    /// Replace the link capability.
    #[must_use]
    pub fn with_linker<L: Linker + 'static>(mut self, linker: L) -> Self {
        self.linker = Box::new(linker);
        self
    }

    #[must_use]
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Walk `roots` and deduplicate everything found.
    ///
    /// Returns the final catalog (reflecting every link made) and the summary.
    ///
    /// # Errors
    ///
    /// - `Scan` if a root does not exist or the walk hits a non-permission I/O error
    /// - `Interrupted` if the shutdown flag is raised
    pub fn dedup_paths(
        &self,
        roots: &[PathBuf],
        walker_config: WalkerConfig,
    ) -> Result<(Catalog, DedupSummary), DedupError> {
        let start = Instant::now();

        let mut builder = InventoryBuilder::new(walker_config);
        if let Some(ref flag) = self.config.shutdown_flag {
            builder = builder.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref cb) = self.config.progress_callback {
            builder = builder.with_progress_callback(Arc::clone(cb));
        }

        let (mut catalog, inventory) = builder.build(roots)?;
        self.check_shutdown()?;

        let mut summary = self.dedup_catalog(&mut catalog)?;
        summary.inventory = inventory;
        summary.duration = start.elapsed();
        Ok((catalog, summary))
    }

    /// Deduplicate an existing catalog, updating it in place.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` if the shutdown flag is raised. Per-file hash and
    /// link failures are recorded in the summary instead.
    pub fn dedup_catalog(&self, catalog: &mut Catalog) -> Result<DedupSummary, DedupError> {
        let start = Instant::now();
        let mut state = RunState::default();
        state.summary.simulated = self.config.simulate;

        let (groups, grouping) = group_by_device_and_size(catalog);
        let total = grouping.potential_duplicates;
        state.summary.grouping = grouping;

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_start("comparing", total);
        }
        let result = self.process_groups(catalog, &groups, &mut state);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_end("comparing");
        }
        result?;

        let mut summary = state.summary;
        summary.duration = start.elapsed();
        log::info!(
            "{} {} files, reduced {} bytes ({})",
            if summary.simulated { "Would link" } else { "Linked" },
            summary.files_linked,
            summary.reduced,
            summary.reduced_display()
        );
        Ok(summary)
    }

    fn process_groups(
        &self,
        catalog: &mut Catalog,
        groups: &[CandidateGroup],
        state: &mut RunState,
    ) -> Result<(), DedupError> {
        let mut current = 0;
        for group in groups {
            for (idx, src) in group.paths.iter().enumerate() {
                self.check_shutdown()?;
                current += 1;
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_progress(current, &src.to_string_lossy());
                }
                self.run_round(catalog, src, &group.paths[idx + 1..], state)?;
            }
        }
        Ok(())
    }

    /// Compare one source against every later member of its group.
    fn run_round(
        &self,
        catalog: &mut Catalog,
        src: &Path,
        others: &[PathBuf],
        state: &mut RunState,
    ) -> Result<(), DedupError> {
        if catalog.get(src).is_none_or(|r| r.size == 0) {
            return Ok(());
        }

        let mut round = Round::default();
        for other in others {
            self.check_shutdown()?;
            if self.visit(catalog, src, other, &mut round, state) == Step::AbandonSource {
                break;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        catalog: &mut Catalog,
        src: &Path,
        other: &Path,
        round: &mut Round,
        state: &mut RunState,
    ) -> Step {
        let Some((src_identity, src_size)) = catalog.get(src).map(|r| (r.identity, r.size)) else {
            return Step::AbandonSource;
        };
        let Some((other_identity, other_size)) = catalog.get(other).map(|r| (r.identity, r.size))
        else {
            return Step::NextCandidate;
        };

        if src_size != other_size || !src_identity.same_device(&other_identity) {
            return Step::NextCandidate;
        }
        if src_identity == other_identity {
            log::trace!(
                "Already the same file: {} and {}",
                src.display(),
                other.display()
            );
            return Step::NextCandidate;
        }
        let other_ino = other_identity.inode;
        if round.skipped_ino.contains(&other_ino) {
            return Step::NextCandidate;
        }

        log::debug!("Comparing {} to {}", src.display(), other.display());
        state.summary.comparisons += 1;

        let mut counted = false;
        if !round.matched_ino.contains(&other_ino) {
            let src_hash = match self.ensure_hash(catalog, src, state) {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("Cannot hash {}, skipping it as a link source: {}", src.display(), e);
                    state.record_hash_failure(src, &e);
                    return Step::AbandonSource;
                }
            };
            let other_hash = match self.ensure_hash(catalog, other, state) {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("Cannot hash {}, skipping it: {}", other.display(), e);
                    state.record_hash_failure(other, &e);
                    return Step::NextCandidate;
                }
            };
            if src_hash != other_hash {
                log::trace!("Content differs: {} and {}", src.display(), other.display());
                round.skipped_ino.insert(other_ino);
                return Step::NextCandidate;
            }
            state.summary.reduced += other_size;
            counted = true;
        }

        log::info!(
            "Link {} to {} (reduced {})",
            src.display(),
            other.display(),
            state.summary.reduced
        );

        match self.replace(catalog, src, other) {
            Ok(()) => {
                round.matched_ino.insert(other_ino);
                state.summary.files_linked += 1;
            }
            Err(e) => {
                log::warn!(
                    "Failed to link {} to {}: {}",
                    src.display(),
                    other.display(),
                    e
                );
                if counted {
                    state.summary.unlinked += other_size;
                }
                state.summary.link_failures.push(LinkFailure {
                    source: src.to_path_buf(),
                    target: other.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
        Step::NextCandidate
    }

    /// Return the cached digest for `path`, hashing it on first use.
    ///
    /// Digests are shared by identity, so each inode is read at most once per run.
    fn ensure_hash(
        &self,
        catalog: &mut Catalog,
        path: &Path,
        state: &mut RunState,
    ) -> Result<Hash, HashError> {
        let Some(record) = catalog.get_mut(path) else {
            return Err(HashError::NotFound(path.to_path_buf()));
        };
        if let Some(hash) = record.content_hash {
            return Ok(hash);
        }
        if let Some(&hash) = state.digests.get(&record.identity) {
            record.content_hash = Some(hash);
            return Ok(hash);
        }

        let hash = self.config.hasher.hash_file(path)?;
        state.summary.files_hashed += 1;
        state.summary.bytes_hashed += record.size;
        state.digests.insert(record.identity, hash);
        record.content_hash = Some(hash);
        Ok(hash)
    }

    /// Replace `other` with a link to `src` and refresh its record.
    fn replace(&self, catalog: &mut Catalog, src: &Path, other: &Path) -> Result<(), LinkError> {
        let Some((src_identity, src_hash)) =
            catalog.get(src).map(|r| (r.identity, r.content_hash))
        else {
            return Err(LinkError::NotFound(src.to_path_buf()));
        };

        if self.config.simulate {
            // Pretend the link happened so later rounds match a real run.
            if let Some(record) = catalog.get_mut(other) {
                record.identity = src_identity;
                record.content_hash = src_hash;
            }
            return Ok(());
        }

        let snapshot = match catalog.get(other) {
            Some(record) => FileSnapshot::from_record(record),
            None => return Err(LinkError::NotFound(other.to_path_buf())),
        };
        self.linker.replace_with_link(src, &snapshot)?;

        let refreshed = std::fs::symlink_metadata(other)
            .ok()
            .and_then(|m| FileRecord::from_metadata(other.to_path_buf(), &m));
        if let Some(record) = catalog.get_mut(other) {
            match refreshed {
                Some(fresh) => *record = fresh,
                None => {
                    log::warn!("Cannot re-stat {} after linking", other.display());
                    record.identity = src_identity;
                }
            }
            record.content_hash = src_hash;
        }
        Ok(())
    }

    fn check_shutdown(&self) -> Result<(), DedupError> {
        if self.config.is_shutdown_requested() {
            log::debug!("Dedup: Shutdown requested, stopping");
            return Err(DedupError::Interrupted);
        }
        Ok(())
    }
}

impl RunState {
    fn record_hash_failure(&mut self, path: &Path, error: &HashError) {
        self.summary.hash_failures.push(HashFailure {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }
}

//! Garbage Collection Module
//!
//! Removes expired entry files, or everything, from a cache tree.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cache::outcome::{self, FsOutcome};
use crate::cache::SweepStats;
use crate::error::{CacheError, Result};

/// Upper bound (inclusive) of the GC draw; probabilities are per million.
pub const GC_DRAW_RANGE: u32 = 1_000_000;

// == Sweep Mode ==
/// What a sweep removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Files whose expiry lies in the past; directories are kept
    ExpiredOnly,
    /// Every file and every directory below the root
    All,
}

// == Garbage Collector ==
/// Probabilistic trigger for expiry sweeps.
#[derive(Debug, Clone, Copy)]
pub struct GarbageCollector {
    /// Chance per call, in parts per million
    probability: u32,
}

impl GarbageCollector {
    pub fn new(probability: u32) -> Self {
        Self { probability }
    }

    /// Draws from `[0, 1_000_000]` and reports whether a sweep is due.
    pub fn should_collect(&self) -> bool {
        self.probability > 0 && rand::thread_rng().gen_range(0..=GC_DRAW_RANGE) < self.probability
    }

    /// Runs an expiry sweep of `base` if the draw says so.
    ///
    /// # Errors
    /// `CacheError::PurgeFailed` if the sweep ran and could not remove a path.
    pub fn maybe_collect(&self, base: &Path, now: i64) -> Result<Option<SweepStats>> {
        if !self.should_collect() {
            return Ok(None);
        }

        debug!(path = %base.display(), "Garbage collection triggered");
        sweep(base, SweepMode::ExpiredOnly, now).map(Some)
    }
}

// == Sweep ==
/// Walks `base` depth-first, handling each directory after its contents.
///
/// Directories whose name starts with `.` are neither entered nor removed,
/// and neither are the directories that contain them. The root itself is
/// never removed. Paths that vanish during the walk are skipped.
///
/// # Errors
/// `CacheError::PurgeFailed` naming the first path that could not be removed.
pub fn sweep(base: &Path, mode: SweepMode, now: i64) -> Result<SweepStats> {
    let mut stats = SweepStats::new();
    let mut directories = Vec::new();
    let mut pinned = HashSet::new();

    let walker = WalkDir::new(base).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !is_hidden_dir(entry) {
            return true;
        }
        // A hidden directory keeps every ancestor below the root alive.
        for ancestor in entry.path().ancestors().skip(1) {
            if ancestor == base {
                break;
            }
            pinned.insert(ancestor.to_path_buf());
        }
        false
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable cache path during sweep");
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        if entry.file_type().is_dir() {
            if mode == SweepMode::All {
                directories.push(entry.into_path());
            }
            continue;
        }

        let path = entry.path();
        let remove = match mode {
            SweepMode::All => true,
            SweepMode::ExpiredOnly => match entry.metadata() {
                Ok(metadata) => metadata
                    .modified()
                    .map(|modified| outcome::to_timestamp(modified) < now)
                    .unwrap_or(false),
                Err(_) => false,
            },
        };

        if remove && purge(path, outcome::remove_file(path))? {
            stats.record_file();
        }
    }

    // Pre-order walk, so reversing it puts every child before its parent.
    for path in directories.iter().rev() {
        if pinned.contains(path) {
            continue;
        }
        if purge(path, outcome::remove_dir(path))? {
            stats.record_directory();
        }
    }

    if !stats.is_empty() {
        info!(
            path = %base.display(),
            files = stats.files_removed,
            directories = stats.directories_removed,
            "Cache sweep finished"
        );
    }

    Ok(stats)
}

/// Turns a removal outcome into whether something was removed, failing
/// on anything other than the path already being gone.
fn purge(path: &Path, outcome: FsOutcome) -> Result<bool> {
    match outcome {
        FsOutcome::Applied => Ok(true),
        FsOutcome::Raced => Ok(false),
        FsOutcome::Failed(source) => Err(CacheError::PurgeFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

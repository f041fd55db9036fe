//! Sweep Statistics Module
//!
//! Counts what a garbage collection or clear pass removed.

use serde::Serialize;

// == Sweep Stats ==
/// Totals for one sweep of the cache tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Number of entry files removed
    pub files_removed: u64,
    /// Number of directories removed (full clears only)
    pub directories_removed: u64,
}

impl SweepStats {
    /// Creates a new SweepStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the removed-file counter.
    pub fn record_file(&mut self) {
        self.files_removed += 1;
    }

    /// Increments the removed-directory counter.
    pub fn record_directory(&mut self) {
        self.directories_removed += 1;
    }

    /// True if the sweep removed nothing.
    pub fn is_empty(&self) -> bool {
        self.files_removed == 0 && self.directories_removed == 0
    }
}

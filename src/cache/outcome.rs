//! Filesystem Outcome Module
//!
//! Each filesystem primitive the cache performs reports one of three
//! outcomes. Callers decide per primitive whether `Raced` is acceptable.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Outcome ==
/// Result of a single filesystem primitive.
#[derive(Debug)]
pub enum FsOutcome {
    /// The operation took effect
    Applied,
    /// Another actor got there first (target vanished, or already created)
    Raced,
    /// A genuine failure
    Failed(io::Error),
}

impl FsOutcome {
    /// Classifies an operation on an existing path: `NotFound` is a race.
    pub fn of(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => FsOutcome::Applied,
            Err(e) if e.kind() == io::ErrorKind::NotFound => FsOutcome::Raced,
            Err(e) => FsOutcome::Failed(e),
        }
    }
}

// == Primitives ==

/// `chmod`
pub fn set_mode(path: &Path, mode: u32) -> FsOutcome {
    FsOutcome::of(apply_mode(path, mode))
}

/// `touch -m` through an open handle: sets the modification time to
/// `timestamp` regardless of the file's permission bits.
pub fn set_mtime(file: &File, timestamp: i64) -> FsOutcome {
    FsOutcome::of(file.set_modified(to_system_time(timestamp)))
}

/// `unlink`
pub fn remove_file(path: &Path) -> FsOutcome {
    FsOutcome::of(fs::remove_file(path))
}

/// `rmdir`
pub fn remove_dir(path: &Path) -> FsOutcome {
    FsOutcome::of(fs::remove_dir(path))
}

/// `mkdir` of a single directory. Losing the creation race to another
/// process that made the same directory is `Raced`.
pub fn create_dir(path: &Path, mode: u32) -> FsOutcome {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    match builder.create(path) {
        Ok(()) => FsOutcome::Applied,
        Err(_) if path.is_dir() => FsOutcome::Raced,
        Err(e) => FsOutcome::Failed(e),
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(path: &Path, _mode: u32) -> io::Result<()> {
    fs::metadata(path).map(|_| ())
}

// == Timestamps ==

/// Converts UNIX seconds to a `SystemTime`.
pub fn to_system_time(timestamp: i64) -> SystemTime {
    if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_secs(timestamp.unsigned_abs())
    }
}

/// Converts a `SystemTime` to whole UNIX seconds, rounding towards the past.
pub fn to_timestamp(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => {
            let before = before.duration();
            let secs = before.as_secs() as i64;
            if before.subsec_nanos() > 0 {
                -secs - 1
            } else {
                -secs
            }
        }
    }
}

/// Modification time of `path` in UNIX seconds, if it is a regular file.
pub fn file_mtime(path: &Path) -> Option<i64> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok().map(to_timestamp)
}

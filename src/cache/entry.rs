//! Cache Entry Module
//!
//! File-level operations on a single cache entry. An entry is one file:
//! its contents are the encoded value and its modification time is the
//! instant the entry expires.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::cache::outcome::{self, FsOutcome};

// == Entry Store ==
/// Reads, writes and deletes entry files.
///
/// Holds no file handles between calls. Cross-process coordination is
/// limited to advisory locks on the entry file itself: shared while
/// reading, exclusive while writing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryStore {
    /// Permission mode applied to entry files after writing
    file_mode: Option<u32>,
}

impl EntryStore {
    pub fn new(file_mode: Option<u32>) -> Self {
        Self { file_mode }
    }

    // == Write ==
    /// Writes `payload` to `path` and stamps it to expire at `expires_at`.
    ///
    /// Returns false if the payload could not be written or the mode or
    /// mtime could not be applied. A file deleted by another process
    /// between those steps does not count as a failure.
    pub fn write(&self, path: &Path, payload: &[u8], expires_at: i64) -> bool {
        // Metadata of a file owned by someone else cannot be changed, so
        // start over with a file of our own.
        if owned_by_other_user(path) {
            debug!(path = %path.display(), "Replacing cache file owned by another user");
            if let FsOutcome::Failed(e) = outcome::remove_file(path) {
                debug!(path = %path.display(), error = %e, "Could not remove foreign cache file");
            }
        }

        let file = match write_locked(path, payload) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write cache file");
                return false;
            }
        };

        let stamped = self.apply_metadata(path, &file, expires_at);
        if let Err(e) = FileExt::unlock(&file) {
            debug!(path = %path.display(), error = %e, "Failed to unlock cache file");
        }
        stamped
    }

    /// Applies the file mode by path, then the expiry through the open
    /// write handle so a mode without owner access cannot block it.
    fn apply_metadata(&self, path: &Path, file: &File, expires_at: i64) -> bool {
        if let Some(mode) = self.file_mode {
            match outcome::set_mode(path, mode) {
                FsOutcome::Applied => {}
                FsOutcome::Raced => {
                    debug!(path = %path.display(), "Cache file removed before chmod");
                }
                FsOutcome::Failed(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to set cache file mode");
                    return false;
                }
            }
        }

        match outcome::set_mtime(file, expires_at) {
            FsOutcome::Applied => true,
            FsOutcome::Raced => {
                debug!(path = %path.display(), "Cache file removed before expiry was set");
                true
            }
            FsOutcome::Failed(e) => {
                warn!(path = %path.display(), error = %e, "Failed to set cache file expiry");
                false
            }
        }
    }

    // == Read ==
    /// Returns the payload of a fresh entry, or `None` if it is missing,
    /// expired, or unreadable. Expired files are left for the collector.
    pub fn read(&self, path: &Path, now: i64) -> Option<Vec<u8>> {
        if !self.exists_fresh(path, now) {
            return None;
        }

        match read_locked(path) {
            Ok(payload) => Some(payload),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                None
            }
        }
    }

    // == Delete ==
    /// Removes the entry file. Deleting a missing entry succeeds.
    pub fn delete(&self, path: &Path) -> bool {
        if !path.exists() {
            return true;
        }

        match outcome::remove_file(path) {
            FsOutcome::Applied => true,
            FsOutcome::Raced => {
                debug!(path = %path.display(), "Cache file already removed");
                true
            }
            FsOutcome::Failed(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete cache file");
                false
            }
        }
    }

    // == Exists Fresh ==
    /// True if `path` is a regular file expiring strictly after `now`.
    ///
    /// An entry whose expiry equals `now` is already expired.
    pub fn exists_fresh(&self, path: &Path, now: i64) -> bool {
        matches!(outcome::file_mtime(path), Some(expires_at) if expires_at > now)
    }
}

/// Writes the payload and returns the file still holding its exclusive
/// lock. The lock is released on unlock or when the handle is dropped.
///
/// The file is truncated only after the lock is held so a reader holding
/// the shared lock never sees it emptied mid-read.
fn write_locked(path: &Path, payload: &[u8]) -> io::Result<File> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    FileExt::lock_exclusive(&file)?;
    replace_contents(&mut file, payload)?;
    Ok(file)
}

fn replace_contents(file: &mut File, payload: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.write_all(payload)?;
    file.flush()
}

/// Reads the whole file while holding a shared lock on it.
fn read_locked(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;

    FileExt::lock_shared(&file)?;
    let mut payload = Vec::new();
    let result = file.read_to_end(&mut payload);
    let unlocked = FileExt::unlock(&file);

    result.and(unlocked).map(|_| payload)
}

#[cfg(unix)]
fn owned_by_other_user(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match fs::metadata(path) {
        // SAFETY: geteuid has no preconditions and cannot fail.
        Ok(metadata) if metadata.is_file() => metadata.uid() != unsafe { libc::geteuid() },
        _ => false,
    }
}

#[cfg(not(unix))]
fn owned_by_other_user(_path: &Path) -> bool {
    false
}

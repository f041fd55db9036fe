//! Directory Provisioning Module
//!
//! Creates cache directories on demand, tolerating other processes that
//! create the same directories at the same time.

use std::path::Path;

use tracing::{debug, warn};

use crate::cache::outcome::{self, FsOutcome};
use crate::error::{CacheError, Result};

// == Ensure Directory ==
/// Makes sure `path` is a directory, creating missing ancestors top-down.
///
/// Every directory created here gets `mode` applied explicitly after
/// creation, since `mkdir` filters the requested mode through the umask.
///
/// # Errors
/// - `DirectoryConflict` if `path` or an ancestor exists as a non-directory
/// - `DirectoryCreateFailed` for any other creation failure
pub fn ensure_dir(path: &Path, mode: u32) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(CacheError::DirectoryConflict {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent, mode)?;
    }

    match outcome::create_dir(path, mode) {
        FsOutcome::Applied => {
            if let FsOutcome::Failed(e) = outcome::set_mode(path, mode) {
                warn!(path = %path.display(), error = %e, "Could not set cache directory mode");
            }
            Ok(())
        }
        FsOutcome::Raced => {
            debug!(path = %path.display(), "Cache directory created concurrently");
            Ok(())
        }
        FsOutcome::Failed(_) if path.exists() && !path.is_dir() => {
            Err(CacheError::DirectoryConflict {
                path: path.to_path_buf(),
            })
        }
        FsOutcome::Failed(source) => Err(CacheError::DirectoryCreateFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

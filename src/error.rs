//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.
//!
//! Only structural failures are errors. Entry-level filesystem failures
//! (a write that could not complete, an unlink that was refused) are
//! reported as `false` by the cache operations instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or contains a reserved character
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// TTL could not be interpreted as a number of seconds
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// A non-directory occupies the path where a cache directory belongs
    #[error("Cache directory path {} exists and is not a directory", path.display())]
    DirectoryConflict { path: PathBuf },

    /// A cache directory could not be created
    #[error("Failed to create cache directory {}: {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Garbage collection could not remove a file or directory
    #[error("Unable to purge {}: {source}", path.display())]
    PurgeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Value could not be serialized
    #[error("Codec error: {0}")]
    Codec(String),
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;

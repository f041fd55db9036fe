//! Configuration Module
//!
//! Handles the construction-time settings of a file cache, either built in
//! code or loaded from environment variables.

use std::env;
use std::path::{Path, PathBuf};

// == Defaults ==
/// Default permission mode for created cache directories (rwxrwxr-x).
pub const DEFAULT_DIRECTORY_MODE: u32 = 0o775;

/// Default suffix appended to every entry file name.
pub const DEFAULT_FILE_SUFFIX: &str = ".bin";

/// Default number of shard directory levels.
pub const DEFAULT_DIRECTORY_LEVEL: usize = 1;

/// Default garbage collection probability, in parts per million.
pub const DEFAULT_GC_PROBABILITY: u32 = 10;

/// Default janitor sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL: u64 = 60;

/// File cache configuration.
///
/// A plain value: the `with_*` methods consume it and return the updated
/// copy, so a configuration shared between caches never changes underneath
/// one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory of the cache tree
    pub cache_path: PathBuf,
    /// Permission mode applied to every directory the cache creates
    pub directory_mode: u32,
    /// Suffix appended to the key to form the entry file name
    pub file_suffix: String,
    /// Permission mode applied to entry files, `None` leaves the umask result
    pub file_mode: Option<u32>,
    /// Number of two-character shard directories between root and entry
    pub directory_level: usize,
    /// Chance that a `set` triggers an expiry sweep, in parts per million
    pub gc_probability: u32,
}

impl CacheConfig {
    /// Creates a configuration rooted at `cache_path` with default settings.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            directory_mode: DEFAULT_DIRECTORY_MODE,
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            file_mode: None,
            directory_level: DEFAULT_DIRECTORY_LEVEL,
            gc_probability: DEFAULT_GC_PROBABILITY,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FILE_CACHE_PATH` - Cache root (default: `$TMPDIR/file-cache`)
    /// - `FILE_CACHE_DIRECTORY_MODE` - Octal directory mode (default: 775)
    /// - `FILE_CACHE_FILE_SUFFIX` - Entry file suffix (default: .bin)
    /// - `FILE_CACHE_FILE_MODE` - Octal file mode (default: unset)
    /// - `FILE_CACHE_DIRECTORY_LEVEL` - Shard depth (default: 1)
    /// - `FILE_CACHE_GC_PROBABILITY` - GC chance per million sets (default: 10)
    pub fn from_env() -> Self {
        let cache_path = env::var_os("FILE_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("file-cache"));

        Self {
            cache_path,
            directory_mode: env::var("FILE_CACHE_DIRECTORY_MODE")
                .ok()
                .and_then(|v| parse_mode(&v))
                .unwrap_or(DEFAULT_DIRECTORY_MODE),
            file_suffix: env::var("FILE_CACHE_FILE_SUFFIX")
                .unwrap_or_else(|_| DEFAULT_FILE_SUFFIX.to_string()),
            file_mode: env::var("FILE_CACHE_FILE_MODE")
                .ok()
                .and_then(|v| parse_mode(&v)),
            directory_level: env::var("FILE_CACHE_DIRECTORY_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DIRECTORY_LEVEL),
            gc_probability: env::var("FILE_CACHE_GC_PROBABILITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_GC_PROBABILITY),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn with_directory_mode(mut self, mode: u32) -> Self {
        self.directory_mode = mode;
        self
    }

    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    pub fn with_file_mode(mut self, mode: Option<u32>) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn with_directory_level(mut self, level: usize) -> Self {
        self.directory_level = level;
        self
    }

    pub fn with_gc_probability(mut self, probability: u32) -> Self {
        self.gc_probability = probability;
        self
    }
}

/// Settings for the janitor binary.
#[derive(Debug, Clone)]
pub struct JanitorConfig {
    /// Cache the janitor sweeps
    pub cache: CacheConfig,
    /// Seconds between expiry sweeps
    pub sweep_interval: u64,
}

impl JanitorConfig {
    /// Loads the cache settings plus `FILE_CACHE_SWEEP_INTERVAL` (default: 60).
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            sweep_interval: env::var("FILE_CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

/// Parses an octal permission mode such as `775`, `0775` or `0o775`.
fn parse_mode(value: &str) -> Option<u32> {
    let digits = value.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    u32::from_str_radix(digits, 8).ok().filter(|mode| *mode <= 0o7777)
}

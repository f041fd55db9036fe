//! File Cache Module
//!
//! Public cache contract over the entry files: validates keys, resolves
//! TTLs into expiry instants, and occasionally triggers garbage collection.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::dir::ensure_dir;
use crate::cache::entry::EntryStore;
use crate::cache::gc::{self, GarbageCollector, SweepMode};
use crate::cache::key::{validate_key, validate_keys};
use crate::cache::path::entry_path;
use crate::cache::ttl::{Expiration, Ttl};
use crate::cache::SweepStats;
use crate::clock::{Clock, SystemClock};
use crate::codec::{Codec, JsonCodec};
use crate::config::CacheConfig;
use crate::error::Result;

// == File Cache ==
/// Filesystem-backed cache. One file per key, expiry in the file's mtime.
///
/// Holds nothing but configuration, so one instance can be shared freely
/// across threads, and any number of processes may use the same directory.
#[derive(Clone)]
pub struct FileCache<C = JsonCodec> {
    config: CacheConfig,
    entries: EntryStore,
    gc: GarbageCollector,
    codec: C,
    clock: Arc<dyn Clock>,
}

impl FileCache<JsonCodec> {
    // == Constructor ==
    /// Creates a cache using JSON payloads and the system clock.
    ///
    /// No directory is created until the first write.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_parts(config, JsonCodec, Arc::new(SystemClock))
    }
}

impl<C: Codec> FileCache<C> {
    fn with_parts(config: CacheConfig, codec: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: EntryStore::new(config.file_mode),
            gc: GarbageCollector::new(config.gc_probability),
            config,
            codec,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Retrieves the value for `key`, or `None` if missing or expired.
    ///
    /// A payload that no longer decodes is treated as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        validate_key(key)?;
        Ok(self.read(key))
    }

    /// Retrieves the value for `key`, or `default` if missing or expired.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// A TTL of zero or less deletes the entry instead and returns what
    /// [`delete`](Self::delete) returns. `Ok(false)` means the entry file
    /// could not be written.
    ///
    /// `Ok(true)` does not promise the next `get` hits: another process may
    /// delete the entry at any moment, including between the payload write
    /// and the expiry update.
    ///
    /// # Errors
    /// - `InvalidKey` before any I/O
    /// - `PurgeFailed` if the garbage collection this call triggered failed
    /// - `DirectoryConflict` / `DirectoryCreateFailed` if the entry's
    ///   directory could not be provisioned
    /// - `Codec` if the value cannot be encoded
    pub fn set<T, L>(&self, key: &str, value: &T, ttl: L) -> Result<bool>
    where
        T: Serialize + ?Sized,
        L: Into<Ttl>,
    {
        validate_key(key)?;
        self.store(key, value, ttl.into())
    }

    // == Delete ==
    /// Removes `key`. Removing a missing key succeeds.
    pub fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.entries.delete(&self.entry_path(key)))
    }

    // == Has ==
    /// True if `key` has an unexpired entry.
    pub fn has(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self
            .entries
            .exists_fresh(&self.entry_path(key), self.clock.now()))
    }

    // == Clear ==
    /// Removes every entry and shard directory. Always reports success.
    pub fn clear(&self) -> bool {
        match gc::sweep(self.cache_path(), SweepMode::All, self.clock.now()) {
            Ok(stats) => debug!(?stats, "Cache cleared"),
            Err(e) => warn!(error = %e, "Cache clear left entries behind"),
        }
        true
    }

    // == Batch Operations ==

    /// Retrieves several keys. Every key is validated before any is read.
    pub fn get_multiple<T, I, K>(&self, keys: I) -> Result<HashMap<String, Option<T>>>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        validate_keys(&keys)?;

        Ok(keys
            .iter()
            .map(|key| (key.as_ref().to_string(), self.read(key.as_ref())))
            .collect())
    }

    /// Retrieves several keys, substituting `default` for misses.
    pub fn get_multiple_or<T, I, K>(&self, keys: I, default: T) -> Result<HashMap<String, T>>
    where
        T: DeserializeOwned + Clone,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Ok(self
            .get_multiple(keys)?
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_else(|| default.clone())))
            .collect())
    }

    /// Stores several values with a shared TTL.
    ///
    /// Keys are validated up front. Entries are then written one by one
    /// with no rollback; a key whose file could not be written is skipped
    /// and the batch still reports success.
    pub fn set_multiple<T, I, K, L>(&self, values: I, ttl: L) -> Result<bool>
    where
        T: Serialize,
        I: IntoIterator<Item = (K, T)>,
        K: AsRef<str>,
        L: Into<Ttl>,
    {
        let values: Vec<(K, T)> = values.into_iter().collect();
        validate_keys(values.iter().map(|(key, _)| key))?;

        let ttl = ttl.into();
        for (key, value) in &values {
            if !self.store(key.as_ref(), value, ttl)? {
                debug!(key = key.as_ref(), "Batch write skipped an entry");
            }
        }
        Ok(true)
    }

    /// Removes several keys. Keys are validated up front; individual
    /// failures are ignored and the batch reports success.
    pub fn delete_multiple<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        validate_keys(&keys)?;

        for key in &keys {
            if !self.entries.delete(&self.entry_path(key.as_ref())) {
                debug!(key = key.as_ref(), "Batch delete skipped an entry");
            }
        }
        Ok(true)
    }

    // == Maintenance ==

    /// Removes every expired entry now, regardless of the GC probability.
    pub fn purge_expired(&self) -> Result<SweepStats> {
        gc::sweep(self.cache_path(), SweepMode::ExpiredOnly, self.clock.now())
    }

    /// Where the entry for `key` lives on disk.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.entry_path(key))
    }

    // == Configuration ==

    pub fn with_directory_mode(&self, mode: u32) -> Self
    where
        C: Clone,
    {
        self.reconfigured(self.config.clone().with_directory_mode(mode))
    }

    pub fn with_file_suffix(&self, suffix: impl Into<String>) -> Self
    where
        C: Clone,
    {
        self.reconfigured(self.config.clone().with_file_suffix(suffix))
    }

    pub fn with_file_mode(&self, mode: Option<u32>) -> Self
    where
        C: Clone,
    {
        self.reconfigured(self.config.clone().with_file_mode(mode))
    }

    pub fn with_directory_level(&self, level: usize) -> Self
    where
        C: Clone,
    {
        self.reconfigured(self.config.clone().with_directory_level(level))
    }

    pub fn with_gc_probability(&self, probability: u32) -> Self
    where
        C: Clone,
    {
        self.reconfigured(self.config.clone().with_gc_probability(probability))
    }

    /// Returns a copy of this cache reading time from `clock`.
    pub fn with_clock(&self, clock: Arc<dyn Clock>) -> Self
    where
        C: Clone,
    {
        Self::with_parts(self.config.clone(), self.codec.clone(), clock)
    }

    /// Returns a copy of this cache encoding payloads with `codec`.
    pub fn with_codec<D: Codec>(&self, codec: D) -> FileCache<D> {
        FileCache::with_parts(self.config.clone(), codec, Arc::clone(&self.clock))
    }

    // == Internals ==

    fn reconfigured(&self, config: CacheConfig) -> Self
    where
        C: Clone,
    {
        Self::with_parts(config, self.codec.clone(), Arc::clone(&self.clock))
    }

    fn cache_path(&self) -> &Path {
        self.config.cache_path()
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        entry_path(
            self.cache_path(),
            key,
            self.config.directory_level,
            &self.config.file_suffix,
        )
    }

    /// Reads and decodes a validated key.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        let payload = self.entries.read(&path, self.clock.now())?;

        match self.codec.decode(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Writes a validated key.
    fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Ttl) -> Result<bool> {
        let now = self.clock.now();
        self.gc.maybe_collect(self.cache_path(), now)?;

        let expires_at = match ttl.expiration(now) {
            Expiration::Expired => return Ok(self.entries.delete(&self.entry_path(key))),
            Expiration::At(expires_at) => expires_at,
        };

        let payload = self.codec.encode(value)?;
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            ensure_dir(parent, self.config.directory_mode)?;
        }

        Ok(self.entries.write(&path, &payload, expires_at))
    }
}

impl<C> fmt::Debug for FileCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCache")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

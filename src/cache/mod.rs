//! Cache Module
//!
//! Provides the file-backed cache: one file per key, sharded into
//! sub-directories, with the expiry instant stored as the file's mtime.

mod dir;
mod entry;
mod gc;
mod key;
mod outcome;
mod path;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use dir::ensure_dir;
pub use entry::EntryStore;
pub use gc::{sweep, GarbageCollector, SweepMode, GC_DRAW_RANGE};
pub use key::{validate_key, validate_keys};
pub use path::{entry_path, shard_segments};
pub use stats::SweepStats;
pub use store::FileCache;
pub use ttl::{Expiration, Ttl, FOREVER_SECONDS, MAX_EXPIRATION};

// == Public Constants ==
/// Characters a key may not contain.
pub const RESERVED_KEY_CHARS: &str = "{}()/\\@:";

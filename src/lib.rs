//! File Cache - A filesystem-backed key-value cache
//!
//! Stores each entry as its own file, encodes expiry in the file's
//! modification time, and collects expired entries probabilistically.
//! Safe to share between threads and between processes using the same
//! directory.

pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{FileCache, SweepStats, Ttl};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use config::{CacheConfig, JanitorConfig};
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;

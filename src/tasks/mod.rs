//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expiry Sweep: Removes expired entry files at configured intervals

mod cleanup;

pub use cleanup::spawn_sweep_task;

//! Key Validation Module
//!
//! Keys become file names, so anything that could act as a path separator
//! or carries reserved meaning in pooled caches is rejected.

use crate::cache::RESERVED_KEY_CHARS;
use crate::error::{CacheError, Result};

// == Validate Key ==
/// Checks a single key.
///
/// # Errors
/// `CacheError::InvalidKey` if the key is empty or contains one of
/// `{ } ( ) / \ @ :`.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }

    if let Some(reserved) = key.chars().find(|c| RESERVED_KEY_CHARS.contains(*c)) {
        return Err(CacheError::InvalidKey(format!(
            "key \"{}\" contains reserved character '{}'",
            key, reserved
        )));
    }

    Ok(())
}

// == Validate Keys ==
/// Checks every key of a batch, stopping at the first invalid one.
pub fn validate_keys<I, K>(keys: I) -> Result<()>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    keys.into_iter().try_for_each(|key| validate_key(key.as_ref()))
}

//! Path Mapping Module
//!
//! Derives the on-disk location of an entry:
//! `{cache_path}/{shard segments...}/{key}{suffix}`.

use std::path::{Path, PathBuf};

// == Shard Segments ==
/// Returns the shard directory names for `key`.
///
/// Segment `i` is the two characters starting at character offset `2 * i`.
/// Short keys stop contributing once the slice runs dry, so `"012"` at two
/// levels yields `["01", "2"]`.
pub fn shard_segments(key: &str, directory_level: usize) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();

    (0..directory_level)
        .map_while(|i| {
            let start = 2 * i;
            if start >= chars.len() {
                return None;
            }
            let end = (start + 2).min(chars.len());
            Some(chars[start..end].iter().collect())
        })
        .collect()
}

// == Entry Path ==
/// Maps a key to its entry file path. Pure: no filesystem access.
pub fn entry_path(base: &Path, key: &str, directory_level: usize, suffix: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in shard_segments(key, directory_level) {
        path.push(segment);
    }
    path.push(format!("{}{}", key, suffix));
    path
}

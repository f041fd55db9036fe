//! Integration Tests for the File Cache
//!
//! Exercises the public cache contract against a real directory tree.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use chrono::TimeDelta;
use file_cache::{
    BincodeCodec, CacheConfig, CacheError, FileCache, ManualClock, SystemClock, Ttl,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// == Helper Functions ==

const RESERVED: [&str; 9] = ["", "{", "}", "(", ")", "/", "\\", "@", ":"];

fn create_test_cache(dir: &TempDir) -> (FileCache, ManualClock) {
    let clock = ManualClock::starting_now();
    let config = CacheConfig::new(dir.path().join("cache")).with_gc_probability(0);
    let cache = FileCache::new(config).with_clock(Arc::new(clock.clone()));
    (cache, clock)
}

fn relative(cache: &FileCache, dir: &TempDir, key: &str) -> PathBuf {
    cache
        .path_for(key)
        .unwrap()
        .strip_prefix(dir.path().join("cache"))
        .unwrap()
        .to_path_buf()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    roles: Vec<String>,
    limits: HashMap<String, u64>,
    manager: Option<Box<Profile>>,
}

fn profile() -> Profile {
    Profile {
        name: "ada".to_string(),
        roles: vec!["admin".to_string(), "ops".to_string()],
        limits: HashMap::from([("cpu".to_string(), 4), ("mem".to_string(), 8192)]),
        manager: Some(Box::new(Profile {
            name: "grace".to_string(),
            roles: vec![],
            limits: HashMap::new(),
            manager: None,
        })),
    }
}

// == Basic Contract ==

#[test]
fn test_set_then_get_and_has() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);

    assert!(cache.set("user_1", &profile(), 60).unwrap());
    assert_eq!(cache.get::<Profile>("user_1").unwrap(), Some(profile()));
    assert!(cache.has("user_1").unwrap());
}

#[test]
fn test_returned_values_are_copies() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    cache.set("user_1", &profile(), Ttl::Forever).unwrap();

    let mut first: Profile = cache.get("user_1").unwrap().unwrap();
    first.roles.push("intruder".to_string());
    first.manager = None;

    let second: Profile = cache.get("user_1").unwrap().unwrap();
    assert_eq!(second, profile());
}

#[test]
fn test_expiration_boundary() {
    let dir = TempDir::new().unwrap();
    let (cache, clock) = create_test_cache(&dir);

    cache.set("k", "v", 2).unwrap();

    clock.advance(1);
    assert_eq!(cache.get::<String>("k").unwrap().as_deref(), Some("v"));

    clock.advance(1);
    assert_eq!(cache.get_or("k", "default".to_string()).unwrap(), "default");
    assert!(!cache.has("k").unwrap());
}

#[test]
fn test_entry_file_encodes_expiry_in_mtime() {
    let dir = TempDir::new().unwrap();
    let (cache, clock) = create_test_cache(&dir);
    let now = file_cache::Clock::now(&clock);

    cache.set("k", "v", TimeDelta::minutes(5)).unwrap();

    let modified = fs::metadata(cache.path_for("k").unwrap())
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    assert_eq!(modified, now + 300);
}

#[test]
fn test_default_ttl_is_one_year() {
    let dir = TempDir::new().unwrap();
    let (cache, clock) = create_test_cache(&dir);

    cache.set("k", "v", None::<i64>).unwrap();

    clock.advance(31_536_000 - 1);
    assert!(cache.has("k").unwrap());
    clock.advance(1);
    assert!(!cache.has("k").unwrap());
}

#[test]
fn test_non_positive_ttl_acts_as_delete() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);

    cache.set("k", "v", 60).unwrap();
    assert!(cache.set("k", "v", -1).unwrap());
    assert!(!cache.has("k").unwrap());

    // Nothing to delete still reports delete's result.
    assert!(cache.set("never", "v", 0).unwrap());
    assert!(!cache.path_for("never").unwrap().exists());
}

#[test]
fn test_string_ttl() {
    let dir = TempDir::new().unwrap();
    let (cache, clock) = create_test_cache(&dir);

    let ttl: Ttl = "10".parse().unwrap();
    cache.set("k", "v", ttl).unwrap();

    clock.advance(9);
    assert!(cache.has("k").unwrap());
    clock.advance(1);
    assert!(!cache.has("k").unwrap());
}

#[test]
fn test_delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);

    assert!(cache.delete("ghost").unwrap());
    cache.set("k", "v", 60).unwrap();
    assert!(cache.delete("k").unwrap());
    assert!(cache.delete("k").unwrap());
    assert!(!cache.has("k").unwrap());
}

#[test]
fn test_expired_entry_left_for_collector() {
    let dir = TempDir::new().unwrap();
    let (cache, clock) = create_test_cache(&dir);

    cache.set("k", "v", 1).unwrap();
    clock.advance(5);

    assert_eq!(cache.get::<String>("k").unwrap(), None);
    assert!(cache.path_for("k").unwrap().exists());

    cache.purge_expired().unwrap();
    assert!(!cache.path_for("k").unwrap().exists());
}

// == Sharding ==

#[test]
fn test_shard_layout() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    let level_two = cache.with_directory_level(2);
    let flat = cache.with_directory_level(0);

    assert_eq!(
        relative(&cache, &dir, "0123456789"),
        PathBuf::from("01").join("0123456789.bin")
    );
    assert_eq!(
        relative(&level_two, &dir, "0123456789"),
        PathBuf::from("01").join("23").join("0123456789.bin")
    );
    assert_eq!(
        relative(&level_two, &dir, "012"),
        PathBuf::from("01").join("2").join("012.bin")
    );
    assert_eq!(relative(&cache, &dir, "0"), PathBuf::from("0").join("0.bin"));
    assert_eq!(
        relative(&flat, &dir, "0123456789"),
        PathBuf::from("0123456789.bin")
    );
}

#[test]
fn test_write_creates_shard_directories_lazily() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    let cache = cache.with_directory_level(2);
    let root = dir.path().join("cache");

    cache.get::<String>("abcdef").unwrap();
    cache.has("abcdef").unwrap();
    assert!(!root.exists());

    cache.set("abcdef", "v", 60).unwrap();
    assert!(root.join("ab").join("cd").join("abcdef.bin").is_file());
}

#[cfg(unix)]
#[test]
fn test_configured_modes_applied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    let cache = cache
        .with_directory_mode(0o770)
        .with_file_mode(Some(0o600));

    cache.set("abc", "v", 60).unwrap();

    let mode = |path: PathBuf| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(dir.path().join("cache")), 0o770);
    assert_eq!(mode(dir.path().join("cache").join("ab")), 0o770);
    assert_eq!(mode(cache.path_for("abc").unwrap()), 0o600);
}

// == Key Validation ==

#[test]
fn test_invalid_keys_rejected_everywhere() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);

    for reserved in RESERVED {
        let key = if reserved.is_empty() {
            String::new()
        } else {
            format!("a{}b", reserved)
        };
        let is_invalid = |result: Result<_, CacheError>| matches!(result, Err(CacheError::InvalidKey(_)));

        assert!(is_invalid(cache.get::<String>(&key).map(|_| ())), "get {:?}", key);
        assert!(is_invalid(cache.set(&key, "v", 60).map(|_| ())), "set {:?}", key);
        assert!(is_invalid(cache.delete(&key).map(|_| ())), "delete {:?}", key);
        assert!(is_invalid(cache.has(&key).map(|_| ())), "has {:?}", key);
        assert!(is_invalid(cache.get_multiple::<String, _, _>(["ok", key.as_str()]).map(|_| ())));
        assert!(is_invalid(cache.set_multiple([("ok", "v"), (key.as_str(), "v")], 60).map(|_| ())));
        assert!(is_invalid(cache.delete_multiple(["ok", key.as_str()]).map(|_| ())));
    }

    assert!(!dir.path().join("cache").exists());
}

#[test]
fn test_invalid_batch_key_prevents_all_mutation() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    cache.set("keep", "original", 60).unwrap();

    let result = cache.set_multiple([("keep", "changed"), ("bad@key", "x")], 60);
    assert!(matches!(result, Err(CacheError::InvalidKey(_))));
    assert_eq!(cache.get::<String>("keep").unwrap().as_deref(), Some("original"));

    let result = cache.delete_multiple(["keep", "bad:key"]);
    assert!(matches!(result, Err(CacheError::InvalidKey(_))));
    assert!(cache.has("keep").unwrap());
}

// == Batch Operations ==

#[test]
fn test_batch_operations() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);

    assert!(cache
        .set_multiple([("a", 1u32), ("b", 2), ("c", 3)], 60)
        .unwrap());

    let values = cache.get_multiple::<u32, _, _>(["a", "b", "missing"]).unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values["a"], Some(1));
    assert_eq!(values["b"], Some(2));
    assert_eq!(values["missing"], None);

    let with_default = cache.get_multiple_or(["c", "missing"], 0u32).unwrap();
    assert_eq!(with_default["c"], 3);
    assert_eq!(with_default["missing"], 0);

    assert!(cache.delete_multiple(["a", "b", "never-set"]).unwrap());
    assert!(!cache.has("a").unwrap());
    assert!(!cache.has("b").unwrap());
    assert!(cache.has("c").unwrap());
}

#[test]
fn test_set_multiple_with_expired_ttl_deletes() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);

    cache.set_multiple([("a", "1"), ("b", "2")], 60).unwrap();
    assert!(cache.set_multiple([("a", "1"), ("b", "2")], 0).unwrap());

    assert!(!cache.has("a").unwrap());
    assert!(!cache.has("b").unwrap());
}

// == Clear and Garbage Collection ==

#[test]
fn test_clear_removes_everything() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    let deep = cache.with_directory_level(3);

    cache.set("alpha", "1", 60).unwrap();
    deep.set("bravo_charlie", "2", Ttl::Forever).unwrap();

    assert!(cache.clear());

    assert_eq!(cache.get::<String>("alpha").unwrap(), None);
    assert_eq!(deep.get::<String>("bravo_charlie").unwrap(), None);
    let root = dir.path().join("cache");
    assert!(root.is_dir());
    assert_eq!(fs::read_dir(root).unwrap().count(), 0);
}

#[test]
fn test_clear_on_missing_directory() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    assert!(cache.clear());
}

#[test]
fn test_certain_gc_on_set_purges_expired_entries() {
    let dir = TempDir::new().unwrap();
    let (cache, clock) = create_test_cache(&dir);

    cache.set("stale", "v", 1).unwrap();
    cache.set("fresh", "v", 1_000).unwrap();
    clock.advance(10);

    let eager = cache.with_gc_probability(1_000_001);
    eager.get::<String>("fresh").unwrap();
    eager.has("fresh").unwrap();
    assert!(cache.path_for("stale").unwrap().exists(), "reads never collect");

    eager.set("other", "v", 60).unwrap();
    assert!(!cache.path_for("stale").unwrap().exists());
    assert!(cache.has("fresh").unwrap());
}

// == Codecs ==

#[test]
fn test_bincode_codec() {
    let dir = TempDir::new().unwrap();
    let (cache, _) = create_test_cache(&dir);
    let cache = cache.with_codec(BincodeCodec);

    cache.set("user_1", &profile(), 60).unwrap();
    assert_eq!(cache.get::<Profile>("user_1").unwrap(), Some(profile()));
}

#[test]
fn test_system_clock_cache() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::new(CacheConfig::new(dir.path()))
        .with_clock(Arc::new(SystemClock));

    cache.set("k", "v", 3_600).unwrap();
    assert_eq!(cache.get::<String>("k").unwrap().as_deref(), Some("v"));
}

// == Concurrency ==

#[test]
fn test_concurrent_set_delete_same_key() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new(dir.path().join("cache")).with_directory_level(2);
    let cache = Arc::new(FileCache::new(config));
    cache.set("bystander", "untouched", 3_600).unwrap();

    let workers: Vec<_> = (0..100)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut failures = 0;
                for round in 0..10 {
                    let value = format!("worker-{}-round-{}", worker, round);
                    match cache.set("shared", &value, 60) {
                        Ok(true) => {}
                        _ => failures += 1,
                    }
                    match cache.delete("shared") {
                        Ok(true) => {}
                        _ => failures += 1,
                    }
                }
                failures
            })
        })
        .collect();

    let failures: u32 = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(failures, 0);
    assert_eq!(
        cache.get::<String>("bystander").unwrap().as_deref(),
        Some("untouched")
    );
}

#[test]
fn test_concurrent_readers_see_whole_values() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(FileCache::new(
        CacheConfig::new(dir.path()).with_gc_probability(0),
    ));
    let payloads = ["a".repeat(10), "b".repeat(50_000)];
    cache.set("shared", &payloads[0], 60).unwrap();

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let payload = payloads[i % 2].clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    cache.set("shared", &payload, 60).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let payloads = payloads.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    if let Some(value) = cache.get::<String>("shared").unwrap() {
                        assert!(payloads.contains(&value), "torn read of {} bytes", value.len());
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
}

//! Typed cache store with ttl-aware lookups.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{CacheStorage, StoredEntry};
use super::traits::{Clock, SystemClock};

/// Key/value cache with per-entry expiry.
///
/// Constructed once by the application and handed to every consumer. Caching is
/// an optimization only, so storage failures never escape: a failed read is a
/// miss and a failed write is dropped. Expired entries are kept until they are
/// overwritten or cleared; callers decide what staleness means to them.
#[derive(Clone)]
pub struct CacheStore {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
}

impl CacheStore {
  /// Create a new store over the given backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock used for expiry decisions.
  #[cfg(test)]
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Get the value stored under `key`, expired or not.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let entry = self.load(key)?;
    match serde_json::from_slice(&entry.payload) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key, error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  /// Store `value` under `key`, replacing any previous entry.
  pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
    let payload = match serde_json::to_vec(value) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(key, error = %e, "failed to serialize cache value");
        return;
      }
    };

    let entry = StoredEntry {
      payload,
      stored_at: self.clock.now(),
      ttl,
    };

    if let Err(e) = self.storage.save(key, entry) {
      warn!(key, error = %e, "failed to write cache entry");
    } else {
      debug!(key, ttl_ms = ttl.num_milliseconds(), "cache entry stored");
    }
  }

  /// Whether the entry under `key` has outlived its ttl. Absent keys are expired.
  pub fn is_expired(&self, key: &str) -> bool {
    self
      .load(key)
      .map(|entry| entry.is_expired_at(self.clock.now()))
      .unwrap_or(true)
  }

  /// Remove every entry, or only those whose key starts with `prefix`.
  pub fn clear_all(&self, prefix: Option<&str>) {
    match self.storage.remove_prefix(prefix) {
      Ok(removed) => debug!(?prefix, removed, "cache cleared"),
      Err(e) => warn!(?prefix, error = %e, "failed to clear cache"),
    }
  }

  fn load(&self, key: &str) -> Option<StoredEntry> {
    match self.storage.load(key) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key, error = %e, "failed to read cache entry");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{MemoryStorage, NoopStorage, SqliteStorage};
  use crate::cache::traits::testing::ManualClock;
  use color_eyre::{eyre::eyre, Result};
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Post {
    id: u64,
    title: String,
  }

  fn post(id: u64) -> Post {
    Post {
      id,
      title: format!("post {id}"),
    }
  }

  fn store_with_clock() -> (CacheStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let store = CacheStore::new(MemoryStorage::new()).with_clock(clock.clone());
    (store, clock)
  }

  /// Backend that fails every operation.
  struct BrokenStorage;

  impl CacheStorage for BrokenStorage {
    fn load(&self, _key: &str) -> Result<Option<StoredEntry>> {
      Err(eyre!("disk on fire"))
    }

    fn save(&self, _key: &str, _entry: StoredEntry) -> Result<()> {
      Err(eyre!("quota exceeded"))
    }

    fn remove_prefix(&self, _prefix: Option<&str>) -> Result<usize> {
      Err(eyre!("disk on fire"))
    }
  }

  #[test]
  fn test_unwritten_key_is_missing_and_expired() {
    let (store, _) = store_with_clock();
    assert_eq!(store.get::<Post>("never"), None);
    assert!(store.is_expired("never"));
  }

  #[test]
  fn test_set_then_get_recent_posts() {
    let (store, _) = store_with_clock();
    let posts = vec![post(1), post(2)];

    store.set("recent_posts", &posts, Duration::minutes(5));

    assert_eq!(store.get::<Vec<Post>>("recent_posts"), Some(posts));
    assert!(!store.is_expired("recent_posts"));
  }

  #[test]
  fn test_expired_entry_is_still_returned() {
    let (store, clock) = store_with_clock();
    store.set("recent_posts", &vec![post(1)], Duration::minutes(5));

    clock.advance(Duration::minutes(5));
    assert!(!store.is_expired("recent_posts"));

    clock.advance(Duration::milliseconds(1));
    assert!(store.is_expired("recent_posts"));
    assert_eq!(store.get::<Vec<Post>>("recent_posts"), Some(vec![post(1)]));
  }

  #[test]
  fn test_set_resets_expiry() {
    let (store, clock) = store_with_clock();
    store.set("k", &post(1), Duration::seconds(10));
    clock.advance(Duration::seconds(11));
    assert!(store.is_expired("k"));

    store.set("k", &post(2), Duration::seconds(10));
    assert!(!store.is_expired("k"));
    assert_eq!(store.get::<Post>("k"), Some(post(2)));
  }

  #[test]
  fn test_clear_all_with_prefix() {
    let (store, _) = store_with_clock();
    store.set("posts_page1", &vec![post(1)], Duration::minutes(5));
    store.set("posts_page2", &vec![post(2)], Duration::minutes(5));
    store.set("user_prefs", &"dark", Duration::minutes(5));

    store.clear_all(Some("posts_"));

    assert_eq!(store.get::<Vec<Post>>("posts_page1"), None);
    assert_eq!(store.get::<Vec<Post>>("posts_page2"), None);
    assert_eq!(store.get::<String>("user_prefs"), Some("dark".to_string()));
  }

  #[test]
  fn test_clear_all_without_prefix() {
    let (store, _) = store_with_clock();
    store.set("posts_page1", &1, Duration::minutes(5));
    store.set("user_prefs", &2, Duration::minutes(5));

    store.clear_all(None);

    assert_eq!(store.get::<i32>("posts_page1"), None);
    assert_eq!(store.get::<i32>("user_prefs"), None);
  }

  #[test]
  fn test_type_mismatch_is_a_miss() {
    let (store, _) = store_with_clock();
    store.set("k", &"not a post", Duration::minutes(5));
    assert_eq!(store.get::<Post>("k"), None);
  }

  #[test]
  fn test_broken_storage_degrades_to_miss() {
    let store = CacheStore::new(BrokenStorage);
    store.set("k", &post(1), Duration::minutes(5));
    store.clear_all(None);
    assert_eq!(store.get::<Post>("k"), None);
    assert!(store.is_expired("k"));
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let store = CacheStore::new(NoopStorage);
    store.set("k", &post(1), Duration::minutes(5));
    assert_eq!(store.get::<Post>("k"), None);
  }

  #[test]
  fn test_sqlite_backed_store() {
    let store = CacheStore::new(SqliteStorage::open_in_memory().unwrap());
    store.set("posts_1", &vec![post(7)], Duration::minutes(5));
    assert_eq!(store.get::<Vec<Post>>("posts_1"), Some(vec![post(7)]));
    assert!(!store.is_expired("posts_1"));
  }
}

//! Session-scoped flags and the once-per-session cache purge.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use super::store::CacheStore;

/// Flag recording that the cache has been purged in this session.
pub const CACHE_CLEANED: &str = "cache-cleaned";

/// Boolean flags that live as long as the running session.
///
/// A session is one run of the process: flags are never persisted, so every
/// start sees them unset and the startup purge runs exactly once per run.
#[derive(Debug, Default)]
pub struct SessionStore {
  flags: Mutex<HashMap<String, bool>>,
}

impl SessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> bool {
    self
      .flags
      .lock()
      .map(|flags| flags.get(name).copied().unwrap_or(false))
      .unwrap_or(false)
  }

  pub fn set(&self, name: &str, value: bool) {
    if let Ok(mut flags) = self.flags.lock() {
      flags.insert(name.to_string(), value);
    }
  }
}

/// Purge entries left over from previous sessions, at most once per session.
///
/// Returns true when the purge ran.
pub fn purge_previous_session(
  store: &CacheStore,
  session: &SessionStore,
  prefix: Option<&str>,
) -> bool {
  if session.get(CACHE_CLEANED) {
    return false;
  }

  store.clear_all(prefix);
  session.set(CACHE_CLEANED, true);
  info!(?prefix, "purged cache from previous session");
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStorage;
  use chrono::Duration;

  #[test]
  fn test_unset_flag_is_false() {
    let session = SessionStore::new();
    assert!(!session.get(CACHE_CLEANED));
    session.set(CACHE_CLEANED, true);
    assert!(session.get(CACHE_CLEANED));
  }

  #[test]
  fn test_purge_runs_once_per_session() {
    let store = CacheStore::new(MemoryStorage::new());
    let session = SessionStore::new();
    store.set("posts_old", &1, Duration::minutes(5));

    assert!(purge_previous_session(&store, &session, None));
    assert_eq!(store.get::<i32>("posts_old"), None);

    // Entries written during this session survive later startup checks
    store.set("posts_new", &2, Duration::minutes(5));
    assert!(!purge_previous_session(&store, &session, None));
    assert_eq!(store.get::<i32>("posts_new"), Some(2));
  }

  #[test]
  fn test_new_session_purges_again() {
    let store = CacheStore::new(MemoryStorage::new());
    assert!(purge_previous_session(&store, &SessionStore::new(), None));
    store.set("posts_a", &1, Duration::minutes(5));
    assert!(purge_previous_session(&store, &SessionStore::new(), None));
    assert_eq!(store.get::<i32>("posts_a"), None);
  }

  #[test]
  fn test_purge_with_prefix() {
    let store = CacheStore::new(MemoryStorage::new());
    store.set("posts_a", &1, Duration::minutes(5));
    store.set("user_prefs", &2, Duration::minutes(5));

    purge_previous_session(&store, &SessionStore::new(), Some("posts_"));

    assert_eq!(store.get::<i32>("posts_a"), None);
    assert_eq!(store.get::<i32>("user_prefs"), Some(2));
  }
}

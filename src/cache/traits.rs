//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Typed description of one logical query.
///
/// Implementors turn a query record into a canonical string; the cache key is
/// derived from it so that call sites never assemble keys by hand.
pub trait QueryKey {
  /// Key namespace, used as the literal key prefix (e.g. "posts").
  fn namespace(&self) -> &'static str;

  /// Canonical form of the query parameters. Logically equal queries must
  /// produce the same string.
  fn canonical(&self) -> String;

  /// Human readable description for logs.
  fn description(&self) -> String;

  /// Stable cache key: `<namespace>_<sha256 of canonical form>`.
  fn cache_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    format!("{}_{}", self.namespace(), hex::encode(hasher.finalize()))
  }
}

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Indicates where the data currently shown came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within its ttl
  CacheFresh,
  /// Data from cache, past its ttl
  CacheStale,
}

impl CacheSource {
  pub fn is_cached(&self) -> bool {
    !matches!(self, CacheSource::Network)
  }
}

#[cfg(test)]
pub mod testing {
  use super::*;
  use std::sync::Mutex;

  /// Clock that only moves when told to.
  pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
  }

  impl ManualClock {
    pub fn new() -> Self {
      Self {
        now: Mutex::new(Utc::now()),
      }
    }

    pub fn advance(&self, by: chrono::Duration) {
      let mut now = self.now.lock().unwrap();
      *now += by;
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
      *self.now.lock().unwrap()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Fixed(&'static str);

  impl QueryKey for Fixed {
    fn namespace(&self) -> &'static str {
      "posts"
    }

    fn canonical(&self) -> String {
      self.0.to_string()
    }

    fn description(&self) -> String {
      format!("fixed {}", self.0)
    }
  }

  #[test]
  fn test_cache_key_is_namespaced() {
    let key = Fixed("page=1").cache_key();
    assert!(key.starts_with("posts_"));
    // sha256 hex digest
    assert_eq!(key.len(), "posts_".len() + 64);
  }

  #[test]
  fn test_cache_key_is_stable() {
    assert_eq!(Fixed("a").cache_key(), Fixed("a").cache_key());
    assert_ne!(Fixed("a").cache_key(), Fixed("b").cache_key());
  }

  #[test]
  fn test_cache_source_is_cached() {
    assert!(!CacheSource::Network.is_cached());
    assert!(CacheSource::CacheFresh.is_cached());
    assert!(CacheSource::CacheStale.is_cached());
  }
}

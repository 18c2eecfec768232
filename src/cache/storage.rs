//! Cache storage trait and backends.

use chrono::{DateTime, Duration, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A serialized cache entry as held by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
  /// JSON-encoded value
  pub payload: Vec<u8>,
  /// When the entry was written
  pub stored_at: DateTime<Utc>,
  /// How long the entry is considered fresh
  pub ttl: Duration,
}

impl StoredEntry {
  /// Whether the entry's ttl has run out at `now`.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now - self.stored_at > self.ttl
  }
}

/// Trait for cache storage backends.
///
/// Backends report failures; the typed `CacheStore` on top decides to swallow them.
pub trait CacheStorage: Send + Sync {
  /// Load the entry stored under `key`.
  fn load(&self, key: &str) -> Result<Option<StoredEntry>>;

  /// Store `entry` under `key`, replacing any previous entry.
  fn save(&self, key: &str, entry: StoredEntry) -> Result<()>;

  /// Remove all entries, or only those whose key starts with `prefix`.
  /// Returns the number of removed entries.
  fn remove_prefix(&self, prefix: Option<&str>) -> Result<usize>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn load(&self, _key: &str) -> Result<Option<StoredEntry>> {
    Ok(None) // Always miss
  }

  fn save(&self, _key: &str, _entry: StoredEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove_prefix(&self, _prefix: Option<&str>) -> Result<usize> {
    Ok(0)
  }
}

/// Process-local storage backed by a hash map.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn save(&self, key: &str, entry: StoredEntry) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), entry);
    Ok(())
  }

  fn remove_prefix(&self, prefix: Option<&str>) -> Result<usize> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let before = entries.len();
    match prefix {
      Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
      None => entries.clear(),
    }
    Ok(before - entries.len())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Create a storage that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("hearth").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    payload BLOB NOT NULL,
    stored_at_ms INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL
);
"#;

impl CacheStorage for SqliteStorage {
  fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, i64, i64)> = conn
      .query_row(
        "SELECT payload, stored_at_ms, ttl_ms FROM cache_entries WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    let Some((payload, stored_at_ms, ttl_ms)) = row else {
      return Ok(None);
    };

    let stored_at = Utc
      .timestamp_millis_opt(stored_at_ms)
      .single()
      .ok_or_else(|| eyre!("Invalid stored_at timestamp {} for {}", stored_at_ms, key))?;

    Ok(Some(StoredEntry {
      payload,
      stored_at,
      ttl: Duration::milliseconds(ttl_ms),
    }))
  }

  fn save(&self, key: &str, entry: StoredEntry) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (cache_key, payload, stored_at_ms, ttl_ms)
         VALUES (?, ?, ?, ?)",
        params![
          key,
          entry.payload,
          entry.stored_at.timestamp_millis(),
          entry.ttl.num_milliseconds()
        ],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }

  fn remove_prefix(&self, prefix: Option<&str>) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // substr() instead of LIKE: '_' in key prefixes must match literally
    let removed = match prefix {
      Some(prefix) => conn.execute(
        "DELETE FROM cache_entries WHERE substr(cache_key, 1, length(?1)) = ?1",
        params![prefix],
      ),
      None => conn.execute("DELETE FROM cache_entries", []),
    }
    .map_err(|e| eyre!("Failed to clear cache entries: {}", e))?;

    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(payload: &str, ttl_secs: i64) -> StoredEntry {
    StoredEntry {
      payload: payload.as_bytes().to_vec(),
      // Millisecond precision survives the SQLite round trip
      stored_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
      ttl: Duration::seconds(ttl_secs),
    }
  }

  fn backends() -> Vec<(&'static str, Box<dyn CacheStorage>)> {
    vec![
      ("memory", Box::new(MemoryStorage::new())),
      ("sqlite", Box::new(SqliteStorage::open_in_memory().unwrap())),
    ]
  }

  #[test]
  fn test_load_missing_key() {
    for (name, storage) in backends() {
      assert_eq!(storage.load("nope").unwrap(), None, "{name}");
    }
  }

  #[test]
  fn test_save_then_load() {
    for (name, storage) in backends() {
      storage.save("posts_1", entry("[1,2]", 60)).unwrap();
      assert_eq!(
        storage.load("posts_1").unwrap(),
        Some(entry("[1,2]", 60)),
        "{name}"
      );
    }
  }

  #[test]
  fn test_save_overwrites() {
    for (name, storage) in backends() {
      storage.save("k", entry("1", 60)).unwrap();
      storage.save("k", entry("2", 30)).unwrap();
      assert_eq!(storage.load("k").unwrap(), Some(entry("2", 30)), "{name}");
    }
  }

  #[test]
  fn test_remove_prefix_is_literal() {
    for (name, storage) in backends() {
      storage.save("posts_a", entry("1", 60)).unwrap();
      storage.save("posts_b", entry("2", 60)).unwrap();
      // Would match "posts_" if '_' were treated as a wildcard
      storage.save("postsXc", entry("3", 60)).unwrap();
      storage.save("user_prefs", entry("4", 60)).unwrap();

      assert_eq!(storage.remove_prefix(Some("posts_")).unwrap(), 2, "{name}");
      assert!(storage.load("posts_a").unwrap().is_none(), "{name}");
      assert!(storage.load("postsXc").unwrap().is_some(), "{name}");
      assert!(storage.load("user_prefs").unwrap().is_some(), "{name}");
    }
  }

  #[test]
  fn test_remove_all() {
    for (name, storage) in backends() {
      storage.save("a", entry("1", 60)).unwrap();
      storage.save("b", entry("2", 60)).unwrap();
      assert_eq!(storage.remove_prefix(None).unwrap(), 2, "{name}");
      assert!(storage.load("a").unwrap().is_none(), "{name}");
    }
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.save("k", entry("1", 60)).unwrap();
    assert!(storage.load("k").unwrap().is_none());
  }

  #[test]
  fn test_entry_expiry() {
    let e = entry("1", 60);
    assert!(!e.is_expired_at(e.stored_at + Duration::seconds(60)));
    assert!(e.is_expired_at(e.stored_at + Duration::seconds(61)));
  }
}

//! Client-side caching for list and detail queries.
//!
//! This module provides:
//! - A typed key/value store with per-entry ttl (`CacheStore`)
//! - Pluggable backends: in-memory, SQLite, or disabled
//! - Typed query keys that map query records to stable string keys
//! - A once-per-session purge of entries left by earlier sessions

mod session;
mod storage;
mod store;
mod traits;

pub use session::{purge_previous_session, SessionStore};
pub use storage::{MemoryStorage, NoopStorage, SqliteStorage};
pub use store::CacheStore;
pub use traits::{CacheSource, QueryKey};

#[cfg(test)]
pub use traits::testing;

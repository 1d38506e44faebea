//! Shared cache service.
//!
//! Schema descriptors and query results are stored behind the [`CacheStore`]
//! trait so the backing store is injected rather than reached for as a
//! global. Two stores ship with the crate:
//!
//! - [`MemoryCache`] - process-local, `DashMap` backed
//! - [`SqliteCache`] - persistent, stored in `~/.pressdb/cache.db` by default
//!
//! Values are JSON strings with an optional time-to-live.
//!
//! # Key Format
//!
//! ```text
//! schema:{table}                              -> TableInfo
//! last_changed:{group}                        -> "1718000000000000000"
//! query:{group}:{sql_hash}:{last_changed}     -> [Row, ...]
//! ```

mod hash;
mod memory;
mod query_cache;
mod sqlite;

pub use hash::{compute_hash, hash_str};
pub use memory::MemoryCache;
pub use query_cache::QueryCache;
pub use sqlite::SqliteCache;

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache connection lock poisoned")]
    Poisoned,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A keyed string store with optional expiry.
pub trait CacheStore: Send + Sync {
    /// Get a live value. Expired entries read as `None`.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value, replacing any previous one. `None` never expires.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Delete a value. Returns whether anything was removed.
    fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry.
    fn clear(&self) -> CacheResult<()>;
}

/// Typed helpers over [`CacheStore`].
pub trait CacheStoreExt: CacheStore {
    /// Get and deserialize a JSON value.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key)? {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a JSON value.
    fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl)
    }
}

impl<T: CacheStore + ?Sized> CacheStoreExt for T {}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries in the cache, expired ones included.
    pub entry_count: usize,
    /// Entries whose TTL has passed but which have not been purged yet.
    pub expired_count: usize,
    /// Total size of all values in bytes.
    pub total_size_bytes: usize,
}

/// Helper for generating cache keys.
pub struct CacheKey;

impl CacheKey {
    /// Key for a table's column descriptors.
    pub fn schema(table: &str) -> String {
        format!("schema:{}", table)
    }

    /// Key for a cache group's last-changed marker.
    pub fn last_changed(group: &str) -> String {
        format!("last_changed:{}", group)
    }

    /// Key for a cached query result.
    ///
    /// The `last_changed` marker is part of the key, so bumping the marker
    /// orphans every result cached before it.
    pub fn query(group: &str, sql_hash: &str, last_changed: &str) -> String {
        format!("query:{}:{}:{}", group, sql_hash, last_changed)
    }
}

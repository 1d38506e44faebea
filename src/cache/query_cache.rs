//! Query-result caching with last-changed cache busting.
//!
//! Every cache group (normally a table name) has a `last_changed` marker.
//! Result keys embed the marker, so [`QueryCache::touch`] invalidates every
//! cached result of the group at once without enumerating keys. Orphaned
//! entries age out through their TTL.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{hash_str, CacheKey, CacheResult, CacheStore, CacheStoreExt};
use crate::observability::log_debug;
use crate::value::Row;

/// Result cache layered over a shared [`CacheStore`].
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Option<Duration>) -> Self {
        Self { store, ttl }
    }

    /// Current marker of a group, initialised to "now" on first use.
    pub fn last_changed(&self, group: &str) -> CacheResult<String> {
        let key = CacheKey::last_changed(group);
        if let Some(marker) = self.store.get(&key)? {
            return Ok(marker);
        }
        let marker = now_nanos().to_string();
        self.store.set(&key, &marker, None)?;
        Ok(marker)
    }

    /// Bump a group's marker, orphaning all results cached under it.
    pub fn touch(&self, group: &str) -> CacheResult<()> {
        let previous = self
            .store
            .get(&CacheKey::last_changed(group))?
            .and_then(|m| m.parse::<u128>().ok());
        // Markers only ever grow, even within one clock tick.
        let marker = match previous {
            Some(prev) => now_nanos().max(prev.saturating_add(1)),
            None => now_nanos(),
        }
        .to_string();
        log_debug!(
            component = "query_cache",
            event = "group_touched",
            group = %group,
            marker = %marker,
        );
        self.store.set(&CacheKey::last_changed(group), &marker, None)
    }

    /// Cached rows for `sql`, if any.
    pub fn get_rows(&self, group: &str, sql: &str) -> CacheResult<Option<Vec<Row>>> {
        let key = self.key_for(group, sql)?;
        self.store.get_json(&key)
    }

    /// Store the rows produced by `sql`.
    pub fn set_rows(&self, group: &str, sql: &str, rows: &[Row]) -> CacheResult<()> {
        let key = self.key_for(group, sql)?;
        self.store.set_json(&key, &rows, self.ttl)
    }

    fn key_for(&self, group: &str, sql: &str) -> CacheResult<String> {
        let marker = self.last_changed(group)?;
        Ok(CacheKey::query(group, &hash_str(sql), &marker))
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

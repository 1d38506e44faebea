//! Schema introspection and caching.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       SchemaCache                         │
//! │   1. in-process memo (DashMap, TTL-checked)               │
//! │   2. shared CacheStore  (key "schema:{table}", 1 week)    │
//! │   3. SchemaSource::describe_table()  on a double miss     │
//! └───────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//!                  Arc<TableInfo>  (column → ColumnDescriptor)
//! ```
//!
//! Introspection failures never surface as errors: the caller gets an empty
//! [`TableInfo`] and every column lookup against it misses.

mod column;
mod source;
mod table_info;

pub use column::{parse_sql_type, ColumnDescriptor, ParsedType, SemanticType};
pub use source::{ColumnRow, IntrospectionError, IntrospectionResult, SchemaSource, StaticSchema};
pub use table_info::TableInfo;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::cache::{CacheKey, CacheResult, CacheStore, CacheStoreExt};
use crate::observability::{log_debug, log_info, log_warn};
use crate::sql::QueryBuilder;
use crate::value::Row;

/// Default lifetime of cached descriptors: one week.
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct Memo {
    info: Arc<TableInfo>,
    fetched_at: Instant,
}

/// Two-level cache of table descriptors.
///
/// Schema changes made at runtime are only picked up once the TTL elapses or
/// [`SchemaCache::invalidate`] is called.
pub struct SchemaCache {
    source: Arc<dyn SchemaSource>,
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    memo: DashMap<String, Memo>,
}

impl SchemaCache {
    pub fn new(source: Arc<dyn SchemaSource>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            source,
            store,
            ttl: DEFAULT_SCHEMA_TTL,
            memo: DashMap::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Column descriptors of `table`.
    ///
    /// Only introspects on a miss in both cache levels. Empty results are
    /// returned but never cached, so a table created later is picked up on
    /// the next call.
    pub fn get_table_info(&self, table: &str) -> Arc<TableInfo> {
        if let Some(info) = self.memo_get(table) {
            return info;
        }

        let key = CacheKey::schema(table);
        match self.store.get_json::<TableInfo>(&key) {
            Ok(Some(info)) => {
                log_debug!(
                    component = "schema",
                    event = "shared_cache_hit",
                    table = %table,
                );
                let info = Arc::new(info);
                self.memo_put(table, Arc::clone(&info));
                return info;
            }
            Ok(None) => {}
            Err(e) => {
                log_warn!(
                    component = "schema",
                    event = "cache_read_failed",
                    table = %table,
                    error = %e,
                );
            }
        }

        let info = match self.source.describe_table(table) {
            Ok(rows) => TableInfo::from_rows(table, &rows),
            Err(e) => {
                log_warn!(
                    component = "schema",
                    event = "introspection_failed",
                    table = %table,
                    error = %e,
                );
                TableInfo::empty(table)
            }
        };

        if info.is_empty() {
            log_warn!(
                component = "schema",
                event = "empty_schema",
                table = %table,
            );
            return Arc::new(info);
        }

        if let Err(e) = self.store.set_json(&key, &info, Some(self.ttl)) {
            log_warn!(
                component = "schema",
                event = "cache_write_failed",
                table = %table,
                error = %e,
            );
        }

        log_info!(
            component = "schema",
            event = "table_introspected",
            table = %table,
            columns = info.len(),
        );

        let info = Arc::new(info);
        self.memo_put(table, Arc::clone(&info));
        info
    }

    /// Coerce `data` against `table`'s column types.
    pub fn format_by_type(&self, table: &str, data: Row) -> Row {
        self.get_table_info(table).format_by_type(data)
    }

    /// Start a SELECT against `table`.
    pub fn query(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new(self.get_table_info(table))
    }

    /// Forget `table` in both cache levels.
    pub fn invalidate(&self, table: &str) -> CacheResult<()> {
        self.memo.remove(table);
        self.store.delete(&CacheKey::schema(table))?;
        Ok(())
    }

    fn memo_get(&self, table: &str) -> Option<Arc<TableInfo>> {
        let memo = self.memo.get(table)?;
        if memo.fetched_at.elapsed() < self.ttl {
            return Some(Arc::clone(&memo.info));
        }
        drop(memo);
        self.memo.remove(table);
        None
    }

    fn memo_put(&self, table: &str, info: Arc<TableInfo>) {
        self.memo.insert(
            table.to_string(),
            Memo {
                info,
                fetched_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: StaticSchema,
        calls: AtomicUsize,
    }

    impl SchemaSource for Counting {
        fn describe_table(&self, table: &str) -> IntrospectionResult<Vec<ColumnRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.describe_table(table)
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            inner: StaticSchema::new().with_table(
                "posts",
                vec![
                    ColumnRow::new("ID", "bigint(20)").primary(),
                    ColumnRow::new("post_status", "varchar(20)"),
                ],
            ),
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_second_lookup_hits_memo() {
        let source = counting();
        let cache = SchemaCache::new(source.clone(), Arc::new(MemoryCache::new()));

        let first = cache.get_table_info("posts");
        let second = cache.get_table_info("posts");

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_store_survives_new_instance() {
        let source = counting();
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());

        SchemaCache::new(source.clone(), Arc::clone(&store)).get_table_info("posts");
        let info = SchemaCache::new(source.clone(), store).get_table_info("posts");

        assert!(info.contains("post_status"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_result_is_not_cached() {
        let source = counting();
        let cache = SchemaCache::new(source.clone(), Arc::new(MemoryCache::new()));

        assert!(cache.get_table_info("ghost").is_empty());
        assert!(cache.get_table_info("ghost").is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_forces_reintrospection() {
        let source = counting();
        let cache = SchemaCache::new(source.clone(), Arc::new(MemoryCache::new()));

        cache.get_table_info("posts");
        cache.invalidate("posts").unwrap();
        cache.get_table_info("posts");

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_huge_ttl_is_accepted() {
        let source = counting();
        let cache = SchemaCache::new(source.clone(), Arc::new(MemoryCache::new()))
            .with_ttl(Duration::from_secs(u64::MAX));

        assert!(cache.get_table_info("posts").contains("ID"));
        assert!(cache.get_table_info("posts").contains("ID"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_ttl_never_serves_stale() {
        let source = counting();
        let cache = SchemaCache::new(source.clone(), Arc::new(MemoryCache::new()))
            .with_ttl(Duration::ZERO);

        cache.get_table_info("posts");
        cache.get_table_info("posts");

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}

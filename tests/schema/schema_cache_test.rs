//! Schema cache behavior across cache levels and stores.

#[cfg(test)]
mod tests {
    use pressdb::cache::{
        CacheError, CacheKey, CacheResult, CacheStore, MemoryCache, SqliteCache,
    };
    use pressdb::schema::{
        ColumnRow, IntrospectionError, IntrospectionResult, SchemaCache, SchemaSource,
        SemanticType, StaticSchema,
    };
    use pressdb::value::{Row, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"
[[tables.posts]]
field = "ID"
type = "bigint(20) unsigned"
key = "PRI"
extra = "auto_increment"

[[tables.posts]]
field = "post_title"
type = "text"

[[tables.posts]]
field = "comment_count"
type = "bigint(20)"
default = "0"

[[tables.posts]]
field = "score"
type = "double"
null = true
"#;

    struct CountingSource {
        inner: StaticSchema,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: StaticSchema::from_toml(FIXTURE).unwrap(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SchemaSource for CountingSource {
        fn describe_table(&self, table: &str) -> IntrospectionResult<Vec<ColumnRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.describe_table(table)
        }
    }

    struct FailingSource;

    impl SchemaSource for FailingSource {
        fn describe_table(&self, _table: &str) -> IntrospectionResult<Vec<ColumnRow>> {
            Err(IntrospectionError::Unavailable("connection refused".into()))
        }
    }

    struct FailingStore;

    impl CacheStore for FailingStore {
        fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Poisoned)
        }

        fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
            Err(CacheError::Poisoned)
        }

        fn delete(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Poisoned)
        }

        fn clear(&self) -> CacheResult<()> {
            Err(CacheError::Poisoned)
        }
    }

    #[test]
    fn test_repeated_lookups_introspect_once() {
        let source = CountingSource::new();
        let cache = SchemaCache::new(source.clone(), Arc::new(MemoryCache::new()));

        for _ in 0..5 {
            let info = cache.get_table_info("posts");
            assert_eq!(info.len(), 4);
        }
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_descriptors_from_fixture() {
        let cache = SchemaCache::new(CountingSource::new(), Arc::new(MemoryCache::new()));
        let info = cache.get_table_info("posts");

        let id = info.column("ID").unwrap();
        assert!(id.is_primary);
        assert!(id.is_auto_increment);
        assert!(id.is_unsigned);
        assert_eq!(id.semantic_type, SemanticType::Int);

        let score = info.column("score").unwrap();
        assert!(score.nullable);
        assert_eq!(score.semantic_type, SemanticType::Float);

        assert_eq!(
            info.column("comment_count").unwrap().default_value.as_deref(),
            Some("0")
        );
        assert_eq!(info.primary_key().map(|c| c.name.as_str()), Some("ID"));
        assert!(info.column("id").is_none());
    }

    #[test]
    fn test_sqlite_store_is_shared_between_processes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        let source = CountingSource::new();

        {
            let store = Arc::new(SqliteCache::open_at(&path).unwrap());
            SchemaCache::new(source.clone(), store).get_table_info("posts");
        }

        let store = Arc::new(SqliteCache::open_at(&path).unwrap());
        let info = SchemaCache::new(source.clone(), store).get_table_info("posts");

        assert!(info.contains("post_title"));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_stored_descriptor_uses_schema_key() {
        let store = Arc::new(MemoryCache::new());
        SchemaCache::new(CountingSource::new(), store.clone()).get_table_info("posts");

        let json = store.get(&CacheKey::schema("posts")).unwrap();
        assert!(json.is_some_and(|s| s.contains("post_title")));
    }

    #[test]
    fn test_failed_introspection_yields_empty_table() {
        let cache = SchemaCache::new(Arc::new(FailingSource), Arc::new(MemoryCache::new()));

        let info = cache.get_table_info("posts");
        assert!(info.is_empty());
        assert_eq!(cache.query("posts").filter("ID", 1).to_sql(), "SELECT * FROM posts");
    }

    #[test]
    fn test_format_by_type() {
        let cache = SchemaCache::new(CountingSource::new(), Arc::new(MemoryCache::new()));

        let mut data = Row::new();
        data.insert("ID".into(), Value::from("15"));
        data.insert("post_title".into(), Value::from(99));
        data.insert("comment_count".into(), Value::Null);
        data.insert("score".into(), Value::Null);
        data.insert("unknown".into(), Value::from("x"));

        let row = cache.format_by_type("posts", data);

        assert_eq!(row.len(), 4);
        assert_eq!(row["ID"], Value::Int(15));
        assert_eq!(row["post_title"], Value::Int(99));
        assert_eq!(row["comment_count"], Value::Int(0));
        assert_eq!(row["score"], Value::Null);
    }

    #[test]
    fn test_invalidate_clears_shared_store() {
        let store = Arc::new(MemoryCache::new());
        let source = CountingSource::new();
        let cache = SchemaCache::new(source.clone(), store.clone());

        cache.get_table_info("posts");
        cache.invalidate("posts").unwrap();

        assert!(store.get(&CacheKey::schema("posts")).unwrap().is_none());
        cache.get_table_info("posts");
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_broken_store_is_bypassed() {
        let source = CountingSource::new();
        let cache = SchemaCache::new(source.clone(), Arc::new(FailingStore));

        let info = cache.get_table_info("posts");
        assert_eq!(info.len(), 4);
        assert!(info.contains("post_title"));
        assert_eq!(
            cache.query("posts").filter("ID", "3").to_sql(),
            "SELECT * FROM posts WHERE ID = 3"
        );
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_reintrospected() {
        let store = Arc::new(MemoryCache::new());
        store
            .set(&CacheKey::schema("posts"), "not json", None)
            .unwrap();
        let source = CountingSource::new();

        let info = SchemaCache::new(source.clone(), store.clone()).get_table_info("posts");

        assert!(info.contains("score"));
        assert_eq!(source.calls(), 1);
        let stored = store.get(&CacheKey::schema("posts")).unwrap().unwrap();
        assert!(stored.contains("post_title"));
    }

    #[test]
    fn test_huge_ttl_through_shared_store() {
        let source = CountingSource::new();
        let store: Arc<dyn CacheStore> = Arc::new(SqliteCache::open_in_memory().unwrap());
        let ttl = Duration::from_secs(u64::MAX);

        SchemaCache::new(source.clone(), Arc::clone(&store))
            .with_ttl(ttl)
            .get_table_info("posts");
        let info = SchemaCache::new(source.clone(), store)
            .with_ttl(ttl)
            .get_table_info("posts");

        assert_eq!(info.len(), 4);
        assert_eq!(source.calls(), 1);
    }
}

//! Repository round trips against an in-memory SQLite database.

#[cfg(test)]
mod tests {
    use pressdb::cache::{CacheError, CacheResult};
    use pressdb::model::RecordError;
    use pressdb::prelude::*;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Post {
        #[serde(rename = "ID")]
        id: Option<i64>,
        post_title: String,
        status: String,
        menu_order: i64,
        rating: Option<f64>,
    }

    impl Post {
        fn new(title: &str, status: &str, menu_order: i64) -> Self {
            Self {
                id: None,
                post_title: title.into(),
                status: status.into(),
                menu_order,
                rating: None,
            }
        }
    }

    impl Record for Post {
        const TABLE: &'static str = "posts";

        fn id(&self) -> Value {
            self.id.into()
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

    struct Fixture {
        db: Arc<SqliteDatabase>,
        schema: Arc<SchemaCache>,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
            db.execute_batch(
                "CREATE TABLE posts (
                    ID INTEGER PRIMARY KEY,
                    post_title TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'draft',
                    menu_order INTEGER NOT NULL DEFAULT 0,
                    rating REAL
                );",
            )
            .unwrap();
            let schema = Arc::new(SchemaCache::new(db.clone(), Arc::new(MemoryCache::new())));
            Self { db, schema }
        }

        fn repo(&self) -> Repository<Post> {
            Repository::new(Arc::clone(&self.schema), self.db.clone())
        }
    }

    #[test]
    fn test_introspected_schema() {
        let fx = Fixture::new();
        let info = fx.repo().table_info();

        assert_eq!(info.len(), 5);
        let id = info.column("ID").unwrap();
        assert!(id.is_primary);
        assert!(id.is_auto_increment);
        assert!(!id.nullable);
        assert!(info.column("rating").unwrap().nullable);
        assert_eq!(info.column("status").unwrap().default_value.as_deref(), Some("'draft'"));
    }

    #[test]
    fn test_insert_then_find() {
        let fx = Fixture::new();
        let repo = fx.repo();

        let first = repo.insert(&Post::new("Hello", "publish", 1)).unwrap();
        let mut post = Post::new("Bob's 100% post", "draft", 2);
        post.rating = Some(4.5);
        let second = repo.insert(&post).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let found = repo.find(second).unwrap().unwrap();
        assert_eq!(found.id, Some(2));
        assert_eq!(found.post_title, "Bob's 100% post");
        assert_eq!(found.rating, Some(4.5));

        assert!(repo.find(99).unwrap().is_none());
    }

    #[test]
    fn test_find_all_with_filters() {
        let fx = Fixture::new();
        let repo = fx.repo();
        for (title, status, order) in [
            ("a", "publish", 3),
            ("b", "draft", 1),
            ("c", "publish", 2),
            ("d", "private", 4),
        ] {
            repo.insert(&Post::new(title, status, order)).unwrap();
        }

        let published = repo
            .find_all(
                repo.query()
                    .filter("status", vec!["publish", "private"])
                    .order_by("menu_order", SortDir::Desc),
            )
            .unwrap();
        let titles: Vec<_> = published.iter().map(|p| p.post_title.as_str()).collect();
        assert_eq!(titles, ["d", "a", "c"]);

        let page = repo
            .find_all(repo.query().order_by("ID", SortDir::Asc).offset(2))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].post_title, "c");

        let all = repo.all().unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, Some(1));
    }

    #[test]
    fn test_update_and_delete() {
        let fx = Fixture::new();
        let repo = fx.repo();

        let id = repo.insert(&Post::new("draft title", "draft", 0)).unwrap();
        let mut post = repo.find(id).unwrap().unwrap();
        post.post_title = "final title".into();
        post.status = "publish".into();
        post.rating = Some(3.0);

        assert_eq!(repo.update(&post).unwrap(), 1);
        assert_eq!(repo.find(id).unwrap(), Some(post));

        assert_eq!(repo.delete(id).unwrap(), 1);
        assert!(repo.find(id).unwrap().is_none());
        assert_eq!(repo.delete(id).unwrap(), 0);
    }

    #[test]
    fn test_query_cache_serves_until_write() {
        let fx = Fixture::new();
        let cache = QueryCache::new(Arc::new(MemoryCache::new()), None);
        let repo = fx.repo().with_query_cache(cache);

        repo.insert(&Post::new("first", "publish", 0)).unwrap();
        assert_eq!(repo.all().unwrap().len(), 1);

        // writes outside the repository are not seen while the entry lives
        fx.db
            .execute_batch("INSERT INTO posts (post_title) VALUES ('sneaky');")
            .unwrap();
        assert_eq!(repo.all().unwrap().len(), 1);

        repo.insert(&Post::new("second", "publish", 0)).unwrap();
        let titles: Vec<_> = repo.all().unwrap().into_iter().map(|p| p.post_title).collect();
        assert_eq!(titles, ["first", "sneaky", "second"]);
    }

    #[test]
    fn test_broken_query_cache_falls_through_to_database() {
        let fx = Fixture::new();
        let cache = QueryCache::new(Arc::new(FailingStore), Some(Duration::from_secs(60)));
        let repo = fx.repo().with_query_cache(cache);

        let id = repo.insert(&Post::new("kept", "publish", 0)).unwrap();
        assert_eq!(repo.all().unwrap().len(), 1);
        assert_eq!(repo.find(id).unwrap().map(|p| p.post_title), Some("kept".into()));

        fx.db
            .execute_batch("INSERT INTO posts (post_title) VALUES ('direct');")
            .unwrap();
        assert_eq!(repo.all().unwrap().len(), 2);
    }

    #[test]
    fn test_strict_policy_rejects_unknown_columns() {
        let fx = Fixture::new();
        let repo = fx.repo().column_policy(ColumnPolicy::Strict);

        let result = repo.find_all(repo.query().filter("post_author", 1));
        assert!(matches!(result, Err(RecordError::Query(_))));
    }

    #[test]
    fn test_unknown_table_has_no_primary_key() {
        let fx = Fixture::new();
        let repo = fx.repo().with_table("wp_posts");

        assert_eq!(repo.table(), "wp_posts");
        assert!(matches!(
            repo.find(1),
            Err(RecordError::NoPrimaryKey(ref t)) if t == "wp_posts"
        ));
    }
}

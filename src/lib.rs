//! # pressdb
//!
//! A schema-aware SQL statement builder for row-oriented tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SchemaSource                            │
//! │   (SqliteDatabase pragma / StaticSchema fixture)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema cache: memo + CacheStore]
//! ┌─────────────────────────────────────────────────────────┐
//! │            TableInfo (column → ColumnDescriptor)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [predicate sanitizer]
//! ┌─────────────────────────────────────────────────────────┐
//! │     QueryBuilder / Insert / Update / Delete              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [token stream → dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Statement: inline SQL, or %d/%f/%s template + args     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [Executor, QueryCache]
//! ┌─────────────────────────────────────────────────────────┐
//! │                Repository<R: Record>                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use pressdb::prelude::*;
//!
//! let source = StaticSchema::new().with_table(
//!     "posts",
//!     vec![
//!         ColumnRow::new("ID", "bigint(20) unsigned").primary().auto_increment(),
//!         ColumnRow::new("status", "varchar(20)"),
//!     ],
//! );
//! let schema = SchemaCache::new(Arc::new(source), Arc::new(MemoryCache::new()));
//!
//! let sql = schema.query("posts").filter("status", "publish").to_sql();
//! assert_eq!(sql, "SELECT * FROM posts WHERE status = 'publish'");
//! ```

mod observability;

pub mod cache;
pub mod config;
pub mod db;
pub mod model;
pub mod schema;
pub mod sql;
pub mod value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{CacheStore, CacheStoreExt, MemoryCache, QueryCache, SqliteCache};
    pub use crate::config::Settings;
    pub use crate::db::{Executor, SqliteDatabase};
    pub use crate::model::{Record, Repository};
    pub use crate::schema::{ColumnRow, SchemaCache, SchemaSource, StaticSchema, TableInfo};
    pub use crate::sql::{
        ColumnPolicy, Delete, Dialect, Insert, QueryBuilder, Relation, SortDir, SqlDialect,
        Statement, Update,
    };
    pub use crate::value::{Row, SqlValue, Value};
}

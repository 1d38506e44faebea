//! Record repository.

use std::marker::PhantomData;
use std::sync::Arc;

use super::{Record, RecordError, RecordResult};
use crate::cache::QueryCache;
use crate::db::Executor;
use crate::observability::{log_debug, log_warn};
use crate::schema::{SchemaCache, TableInfo};
use crate::sql::{ColumnPolicy, Delete, Insert, QueryBuilder, SortDir, Statement, Update};
use crate::value::{Row, Value};

/// Reads and writes records of type `R`.
///
/// Reads go through the query cache when one is configured. Every write
/// touches the table's last-changed marker so cached reads are never served
/// after a change made through the repository.
pub struct Repository<R: Record> {
    schema: Arc<SchemaCache>,
    executor: Arc<dyn Executor>,
    query_cache: Option<QueryCache>,
    policy: ColumnPolicy,
    table: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Repository<R> {
    pub fn new(schema: Arc<SchemaCache>, executor: Arc<dyn Executor>) -> Self {
        Self {
            schema,
            executor,
            query_cache: None,
            policy: ColumnPolicy::default(),
            table: R::TABLE.to_string(),
            _record: PhantomData,
        }
    }

    pub fn with_query_cache(mut self, cache: QueryCache) -> Self {
        self.query_cache = Some(cache);
        self
    }

    /// Override the table name, e.g. to apply a table prefix.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn column_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn table_info(&self) -> Arc<TableInfo> {
        self.schema.get_table_info(&self.table)
    }

    /// A SELECT on this table in the executor's dialect.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.table_info())
            .dialect(self.executor.dialect())
            .column_policy(self.policy)
    }

    /// Fetch one record by primary key.
    pub fn find(&self, id: impl Into<Value>) -> RecordResult<Option<R>> {
        let info = self.table_info();
        let pk = self.primary_key(&info)?;
        let query = self.query().filter(&pk, id).limit(1);
        Ok(self.find_all(query)?.into_iter().next())
    }

    /// Fetch every record matching `query`.
    pub fn find_all(&self, query: QueryBuilder) -> RecordResult<Vec<R>> {
        let info = Arc::clone(query.table_info());
        let stmt = query.render_checked()?;
        self.fetch_rows(&stmt)?
            .into_iter()
            .map(|row| R::from_row(&info, row))
            .collect()
    }

    /// Fetch every record, ordered by primary key.
    pub fn all(&self) -> RecordResult<Vec<R>> {
        let info = self.table_info();
        let query = match info.primary_key() {
            Some(pk) => self.query().order_by(&pk.name, SortDir::Asc),
            None => self.query(),
        };
        self.find_all(query)
    }

    /// Insert a record and return the generated id.
    pub fn insert(&self, record: &R) -> RecordResult<i64> {
        let stmt = Insert::new(self.table_info(), record.to_row()?)
            .dialect(self.executor.dialect())
            .render()?;
        self.executor.execute(&stmt)?;
        let id = self.executor.last_insert_id()?;
        self.touch();
        Ok(id)
    }

    /// Write every column of `record` to the row with its primary key.
    pub fn update(&self, record: &R) -> RecordResult<u64> {
        let info = self.table_info();
        let pk = self.primary_key(&info)?;
        let mut row: Row = record.to_row()?;
        row.remove(&pk);

        let stmt = Update::new(info, row)
            .filter(&pk, record.id())
            .dialect(self.executor.dialect())
            .render()?;
        let affected = self.executor.execute(&stmt)?;
        self.touch();
        Ok(affected)
    }

    /// Delete the row with primary key `id`.
    pub fn delete(&self, id: impl Into<Value>) -> RecordResult<u64> {
        let info = self.table_info();
        let pk = self.primary_key(&info)?;
        let stmt = Delete::new(info)
            .filter(&pk, id)
            .dialect(self.executor.dialect())
            .render()?;
        let affected = self.executor.execute(&stmt)?;
        self.touch();
        Ok(affected)
    }

    fn primary_key(&self, info: &TableInfo) -> RecordResult<String> {
        info.primary_key()
            .map(|c| c.name.clone())
            .ok_or_else(|| RecordError::NoPrimaryKey(self.table.clone()))
    }

    fn fetch_rows(&self, stmt: &Statement) -> RecordResult<Vec<Row>> {
        let Some(cache) = &self.query_cache else {
            return Ok(self.executor.fetch_all(stmt)?);
        };

        let sql = stmt.to_sql();
        match cache.get_rows(&self.table, &sql) {
            Ok(Some(rows)) => {
                log_debug!(
                    component = "repository",
                    event = "query_cache_hit",
                    table = %self.table,
                );
                return Ok(rows);
            }
            Ok(None) => {}
            Err(e) => log_warn!(
                component = "repository",
                event = "query_cache_read_failed",
                table = %self.table,
                error = %e,
            ),
        }

        let rows = self.executor.fetch_all(stmt)?;
        if let Err(e) = cache.set_rows(&self.table, &sql, &rows) {
            log_warn!(
                component = "repository",
                event = "query_cache_write_failed",
                table = %self.table,
                error = %e,
            );
        }
        Ok(rows)
    }

    fn touch(&self) {
        let Some(cache) = &self.query_cache else {
            return;
        };
        if let Err(e) = cache.touch(&self.table) {
            log_warn!(
                component = "repository",
                event = "touch_failed",
                table = %self.table,
                error = %e,
            );
        }
    }
}

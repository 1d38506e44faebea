//! SELECT query builder.
//!
//! A [`QueryBuilder`] is bound to one table's schema. Filters, select columns
//! and sort columns are checked against that schema as they are added, so
//! rendering is a single infallible pass:
//!
//! ```text
//! SELECT <select> FROM <table>[ WHERE …][ ORDER BY …][ LIMIT n][ OFFSET m]
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pressdb::schema::{ColumnRow, TableInfo};
//! use pressdb::sql::QueryBuilder;
//!
//! let info = TableInfo::from_rows(
//!     "posts",
//!     &[
//!         ColumnRow::new("status", "varchar(20)"),
//!         ColumnRow::new("post_type", "varchar(20)"),
//!     ],
//! );
//! let sql = QueryBuilder::new(Arc::new(info))
//!     .filter("status", "publish")
//!     .filter_op("post_type", "IN", vec!["post", "page"])
//!     .render()
//!     .to_sql();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM posts WHERE status = 'publish' AND post_type IN('post','page')"
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dialect::{Dialect, SqlDialect};
use super::predicate::{DropReason, Dropped, PredicateGroup, Relation};
use super::token::{Token, TokenStream};
use crate::observability::log_warn;
use crate::schema::TableInfo;
use crate::value::{SqlValue, Value};

/// Errors from strict rendering.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{} column reference(s) dropped under strict column policy: {}", .0.len(), join_dropped(.0))]
    DroppedPredicates(Vec<Dropped>),
}

/// Result type for query rendering.
pub type QueryResult<T> = Result<T, QueryError>;

fn join_dropped(dropped: &[Dropped]) -> String {
    dropped
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// What to do with references to columns the schema does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPolicy {
    /// Drop the reference and log it.
    #[default]
    Lenient,
    /// Like `Lenient`, but [`QueryBuilder::render_checked`] fails.
    Strict,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ASC" => Some(SortDir::Asc),
            "DESC" => Some(SortDir::Desc),
            _ => None,
        }
    }

    fn token(self) -> Token {
        match self {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        }
    }
}

// ============================================================================
// Statement
// ============================================================================

/// A rendered statement.
///
/// Holds the token stream so the same statement can be turned into inline
/// SQL or into a prepared template plus arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    table: String,
    tokens: TokenStream,
    dialect: Dialect,
}

impl Statement {
    pub(crate) fn new(table: &str, tokens: TokenStream, dialect: Dialect) -> Self {
        Self {
            table: table.into(),
            tokens,
            dialect,
        }
    }

    /// The table this statement targets.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// SQL with every value inlined and escaped.
    pub fn to_sql(&self) -> String {
        self.tokens.serialize(self.dialect)
    }

    /// SQL with `%d`/`%f`/`%s` placeholders.
    pub fn template(&self) -> String {
        self.tokens.template(self.dialect)
    }

    /// Arguments for [`Statement::template`], in order.
    pub fn args(&self) -> Vec<SqlValue> {
        self.tokens.params()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

// ============================================================================
// Query builder
// ============================================================================

/// Fluent SELECT builder bound to one table's schema.
#[derive(Debug, Clone)]
#[must_use]
pub struct QueryBuilder {
    info: Arc<TableInfo>,
    select: Vec<String>,
    count: bool,
    filters: PredicateGroup,
    order_by: Vec<(String, SortDir)>,
    limit: Option<u64>,
    offset: Option<u64>,
    dialect: Dialect,
    policy: ColumnPolicy,
}

impl QueryBuilder {
    pub fn new(info: Arc<TableInfo>) -> Self {
        Self {
            filters: PredicateGroup::new(Arc::clone(&info), Relation::And),
            info,
            select: Vec::new(),
            count: false,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            dialect: Dialect::default(),
            policy: ColumnPolicy::default(),
        }
    }

    pub fn table_info(&self) -> &Arc<TableInfo> {
        &self.info
    }

    /// Filter by equality, or by `IN` when `value` is a list.
    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters = self.filters.filter(column, value);
        self
    }

    /// Filter with an explicit operator.
    pub fn filter_op(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.filters = self.filters.filter_op(column, operator, value);
        self
    }

    /// Filter with optional operator and relation.
    ///
    /// At the top level every predicate is AND-joined; `relation` only
    /// matters inside [`filter_group`](Self::filter_group).
    pub fn filter_with(
        mut self,
        column: &str,
        value: impl Into<Value>,
        operator: Option<&str>,
        relation: Option<Relation>,
    ) -> Self {
        self.filters = self.filters.filter_with(column, value, operator, relation);
        self
    }

    /// Add a parenthesized group of predicates.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use pressdb::schema::{ColumnRow, TableInfo};
    /// # use pressdb::sql::{QueryBuilder, Relation};
    /// # let info = Arc::new(TableInfo::from_rows("posts", &[ColumnRow::new("post_type", "varchar(20)")]));
    /// let sql = QueryBuilder::new(info)
    ///     .filter_group(Relation::Or, |g| g.filter("post_type", "post").filter("post_type", "page"))
    ///     .render()
    ///     .to_sql();
    /// assert_eq!(sql, "SELECT * FROM posts WHERE (post_type = 'post' OR post_type = 'page')");
    /// ```
    pub fn filter_group<F>(mut self, relation: Relation, build: F) -> Self
    where
        F: FnOnce(PredicateGroup) -> PredicateGroup,
    {
        self.filters = self.filters.filter_group(relation, build);
        self
    }

    /// Select specific columns instead of `*`.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let column = column.as_ref();
            if self.check_column(column) {
                self.select.push(column.to_string());
            }
        }
        self
    }

    /// Select `COUNT(*)`.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn order_by(mut self, column: &str, dir: SortDir) -> Self {
        if self.check_column(column) {
            self.order_by.push((column.to_string(), dir));
        }
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn column_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// References that were dropped so far.
    pub fn dropped(&self) -> &[Dropped] {
        self.filters.dropped()
    }

    fn check_column(&mut self, column: &str) -> bool {
        if self.info.contains(column) {
            return true;
        }
        log_warn!(
            component = "query",
            event = "column_dropped",
            table = %self.info.name(),
            column = %column,
        );
        self.filters.record_dropped(Dropped {
            column: column.to_string(),
            reason: DropReason::UnknownColumn,
        });
        false
    }

    /// Render the statement. Never fails; see [`QueryBuilder::dropped`].
    pub fn render(&self) -> Statement {
        let mut ts = TokenStream::new();

        ts.push(Token::Select).space();
        if self.count {
            ts.push(Token::FunctionName("count".into()))
                .lparen()
                .push(Token::Star)
                .rparen();
        } else if self.select.is_empty() {
            ts.push(Token::Star);
        } else {
            for (i, column) in self.select.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(column.clone()));
            }
        }

        ts.space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.info.name().to_string()));

        let filters = self.filters.to_tokens(true);
        if !filters.is_empty() {
            ts.space().push(Token::Where).space().append(&filters);
        }

        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            for (i, (column, dir)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(column.clone()))
                    .space()
                    .push(dir.token());
            }
        }

        let pagination = self.dialect.emit_limit_offset(self.limit, self.offset);
        if !pagination.is_empty() {
            ts.space().append(&pagination);
        }

        Statement::new(self.info.name(), ts, self.dialect)
    }

    /// Render, failing under [`ColumnPolicy::Strict`] if anything was dropped.
    pub fn render_checked(&self) -> QueryResult<Statement> {
        if self.policy == ColumnPolicy::Strict && !self.dropped().is_empty() {
            return Err(QueryError::DroppedPredicates(self.dropped().to_vec()));
        }
        Ok(self.render())
    }

    /// Shorthand for `render().to_sql()`.
    pub fn to_sql(&self) -> String {
        self.render().to_sql()
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

//! Statement execution.
//!
//! The builders only render SQL. Running it is the job of an [`Executor`],
//! injected wherever rows are read or written. [`SqliteDatabase`] is the
//! bundled implementation and doubles as a [`SchemaSource`](crate::schema::SchemaSource).

mod sqlite;

pub use sqlite::SqliteDatabase;

use thiserror::Error;

use crate::sql::{Dialect, Statement};
use crate::value::Row;

/// Errors raised while running a statement.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("statement rendered for {found}, executor expects {expected}")]
    DialectMismatch { expected: Dialect, found: Dialect },

    #[error("failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error("database connection lock poisoned")]
    Poisoned,
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Runs rendered statements.
pub trait Executor: Send + Sync {
    /// Dialect statements must be rendered with.
    fn dialect(&self) -> Dialect;

    /// Run a query and collect every row.
    fn fetch_all(&self, stmt: &Statement) -> ExecResult<Vec<Row>>;

    /// Run a write and return the number of affected rows.
    fn execute(&self, stmt: &Statement) -> ExecResult<u64>;

    /// Id generated by the most recent INSERT.
    fn last_insert_id(&self) -> ExecResult<i64>;
}

/// Turn a `%d`/`%f`/`%s` template into `?` positional SQL.
pub(crate) fn positional(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('d' | 'f' | 's') => {
                chars.next();
                out.push('?');
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }
    out
}

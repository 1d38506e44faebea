//! SQL generation module.
//!
//! Schema-checked statement builders that render single-line SQL for MySQL
//! or SQLite:
//!
//! - [`predicate`] - filter sanitization and WHERE trees
//! - [`query`] - SELECT builder and the rendered [`Statement`]
//! - [`dml`] - INSERT, UPDATE and DELETE
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod dml;
pub mod predicate;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{escape_like, Dialect, SqlDialect};
pub use dml::{Delete, DmlError, DmlResult, Insert, Update};
pub use predicate::{
    sanitize_predicate, DropReason, Dropped, Operand, Operator, Predicate, PredicateGroup,
    PredicateNode, Relation,
};
pub use query::{ColumnPolicy, QueryBuilder, QueryError, QueryResult, SortDir, Statement};
pub use token::{Token, TokenStream};

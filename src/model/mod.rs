//! Typed records on top of the builders.
//!
//! A [`Record`] is a plain serde struct bound to one table. A
//! [`Repository`] reads and writes records through an injected
//! [`Executor`](crate::db::Executor), optionally caching reads in a
//! [`QueryCache`](crate::cache::QueryCache).
//!
//! ```
//! use pressdb::model::Record;
//! use pressdb::value::Value;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Post {
//!     #[serde(rename = "ID")]
//!     id: Option<i64>,
//!     post_title: String,
//! }
//!
//! impl Record for Post {
//!     const TABLE: &'static str = "posts";
//!
//!     fn id(&self) -> Value {
//!         self.id.into()
//!     }
//! }
//! ```

mod repository;

pub use repository::Repository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::db::ExecError;
use crate::schema::TableInfo;
use crate::sql::{DmlError, QueryError};
use crate::value::{Row, Value};

/// Errors from record conversion and repository operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table '{0}' has no primary key")]
    NoPrimaryKey(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Dml(#[from] DmlError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// A struct stored as one row of [`Record::TABLE`].
///
/// Field names are column names; the struct must serialize to a flat map.
pub trait Record: Serialize + DeserializeOwned {
    /// Table name, without any configured prefix.
    const TABLE: &'static str;

    /// Primary key value. `Value::Null` for a record not inserted yet.
    fn id(&self) -> Value;

    fn to_row(&self) -> RecordResult<Row> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }

    /// Build a record from a fetched row, coercing it to the table's
    /// column types first.
    fn from_row(info: &TableInfo, row: Row) -> RecordResult<Self> {
        let row = info.format_by_type(row);
        Ok(serde_json::from_value(serde_json::to_value(row)?)?)
    }
}

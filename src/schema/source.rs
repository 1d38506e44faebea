//! Table introspection sources.
//!
//! A [`SchemaSource`] answers "what columns does this table have?" with rows
//! shaped like MySQL's `SHOW COLUMNS` output. The schema cache parses those
//! rows into [`ColumnDescriptor`](super::ColumnDescriptor)s.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while introspecting a table.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("introspection unavailable: {0}")]
    Unavailable(String),
}

pub type IntrospectionResult<T> = Result<T, IntrospectionError>;

/// One raw column metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRow {
    pub field: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Whether NULL values are allowed.
    #[serde(default)]
    pub null: bool,
    /// Key flag: `PRI`, `UNI`, `MUL` or empty.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub default: Option<String>,
    /// Extra attributes such as `auto_increment`.
    #[serde(default)]
    pub extra: String,
}

impl ColumnRow {
    pub fn new(field: &str, sql_type: &str) -> Self {
        Self {
            field: field.into(),
            sql_type: sql_type.into(),
            null: false,
            key: String::new(),
            default: None,
            extra: String::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.key = "PRI".into();
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.extra = "auto_increment".into();
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Anything that can describe a table's columns.
pub trait SchemaSource: Send + Sync {
    /// Return the column rows of `table`, in ordinal order.
    ///
    /// An unknown table is not an error; it yields an empty list.
    fn describe_table(&self, table: &str) -> IntrospectionResult<Vec<ColumnRow>>;
}

/// In-memory schema, typically loaded from a TOML fixture.
///
/// ```toml
/// [[tables.posts]]
/// field = "ID"
/// type = "bigint(20) unsigned"
/// key = "PRI"
/// extra = "auto_increment"
///
/// [[tables.posts]]
/// field = "post_status"
/// type = "varchar(20)"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticSchema {
    #[serde(default)]
    pub tables: HashMap<String, Vec<ColumnRow>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, rows: Vec<ColumnRow>) -> Self {
        self.tables.insert(table.into(), rows);
        self
    }

    pub fn from_toml(content: &str) -> IntrospectionResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> IntrospectionResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

impl SchemaSource for StaticSchema {
    fn describe_table(&self, table: &str) -> IntrospectionResult<Vec<ColumnRow>> {
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}

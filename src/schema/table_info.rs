//! Per-table column maps and value coercion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::column::{parse_sql_type, ColumnDescriptor, SemanticType};
use super::source::ColumnRow;
use crate::value::{Format, Row, Value};

/// Column descriptors of one table, keyed by column name.
///
/// An empty `TableInfo` is a valid value: it is what an unknown table, or a
/// failed introspection, looks like. Every column lookup against it misses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    table: String,
    columns: BTreeMap<String, ColumnDescriptor>,
}

impl TableInfo {
    pub fn new(table: &str, columns: impl IntoIterator<Item = ColumnDescriptor>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    pub fn empty(table: &str) -> Self {
        Self::new(table, [])
    }

    /// Build descriptors from raw introspection rows.
    pub fn from_rows(table: &str, rows: &[ColumnRow]) -> Self {
        let columns = rows.iter().enumerate().map(|(position, row)| {
            let parsed = parse_sql_type(&row.sql_type);
            ColumnDescriptor {
                name: row.field.clone(),
                sql_type: row.sql_type.clone(),
                semantic_type: parsed.semantic,
                length: parsed.length,
                scale: parsed.scale,
                nullable: row.null,
                default_value: row.default.clone(),
                is_primary: row.key.eq_ignore_ascii_case("PRI"),
                is_auto_increment: row.extra.to_lowercase().contains("auto_increment"),
                is_unsigned: parsed.unsigned,
                position,
            }
        });
        Self::new(table, columns)
    }

    pub fn name(&self) -> &str {
        &self.table
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Parameter format of a column, if it exists.
    pub fn format(&self, name: &str) -> Option<Format> {
        self.column(name).map(ColumnDescriptor::format)
    }

    /// Columns in ordinal order.
    pub fn columns(&self) -> Vec<&ColumnDescriptor> {
        let mut cols: Vec<_> = self.columns.values().collect();
        cols.sort_by_key(|c| c.position);
        cols
    }

    /// The first primary key column.
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns().into_iter().find(|c| c.is_primary)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Coerce a row to the table's column types.
    ///
    /// Keys that are not columns of the table are dropped. Integer and float
    /// columns are converted; string columns pass through untouched. NULL
    /// survives on nullable columns only.
    pub fn format_by_type(&self, data: Row) -> Row {
        data.into_iter()
            .filter_map(|(key, value)| {
                let column = self.column(&key)?;
                let value = coerce(column, value);
                Some((key, value))
            })
            .collect()
    }
}

fn coerce(column: &ColumnDescriptor, value: Value) -> Value {
    if value.is_null() && column.nullable {
        return Value::Null;
    }
    match column.semantic_type {
        SemanticType::Int => Value::Int(value.to_int()),
        SemanticType::Float => Value::Float(value.to_float()),
        SemanticType::String => value,
    }
}

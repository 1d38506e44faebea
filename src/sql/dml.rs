//! Data Manipulation Language (DML) statements.
//!
//! - [`Insert`] - INSERT INTO … VALUES …
//! - [`Update`] - UPDATE … SET … WHERE …
//! - [`Delete`] - DELETE FROM … WHERE …
//!
//! Rows are coerced with [`TableInfo::format_by_type`] first, so unknown
//! keys never reach SQL text. UPDATE and DELETE refuse to run without a
//! surviving filter.

use std::sync::Arc;

use thiserror::Error;

use super::dialect::Dialect;
use super::predicate::{Dropped, PredicateGroup, Relation};
use super::query::Statement;
use super::token::{Token, TokenStream};
use crate::schema::TableInfo;
use crate::value::{Row, SqlValue, Value};

/// Errors from rendering write statements.
#[derive(Debug, Error)]
pub enum DmlError {
    #[error("no known columns to write in table '{0}'")]
    NoColumns(String),

    #[error("refusing to {verb} every row of '{table}' without a filter")]
    Unfiltered { verb: &'static str, table: String },
}

/// Result type for DML rendering.
pub type DmlResult<T> = Result<T, DmlError>;

/// Coerced column/value pairs in ordinal column order.
fn assignments(info: &TableInfo, row: Row) -> Vec<(String, Value)> {
    let mut row = info.format_by_type(row);
    info.columns()
        .into_iter()
        .filter_map(|c| row.remove(&c.name).map(|v| (c.name.clone(), v)))
        .collect()
}

fn param(value: &Value, info: &TableInfo, column: &str) -> Token {
    if value.is_null() {
        return Token::LitNull;
    }
    match info.format(column) {
        Some(format) => Token::Param(format.coerce(value)),
        None => Token::Param(SqlValue::Text(value.to_text())),
    }
}

// ============================================================================
// INSERT
// ============================================================================

/// INSERT of a single row.
#[derive(Debug, Clone)]
#[must_use]
pub struct Insert {
    info: Arc<TableInfo>,
    values: Vec<(String, Value)>,
    dialect: Dialect,
}

impl Insert {
    /// Auto-increment columns whose value is NULL are left for the database
    /// to fill.
    pub fn new(info: Arc<TableInfo>, mut row: Row) -> Self {
        // before coercion, which turns NULL into 0 on NOT NULL columns
        row.retain(|name, value| {
            !(value.is_null() && info.column(name).is_some_and(|c| c.is_auto_increment))
        });
        let values = assignments(&info, row);
        Self {
            info,
            values,
            dialect: Dialect::default(),
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn render(&self) -> DmlResult<Statement> {
        if self.values.is_empty() {
            return Err(DmlError::NoColumns(self.info.name().into()));
        }

        let mut ts = TokenStream::new();
        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .push(Token::Ident(self.info.name().into()))
            .space()
            .lparen();
        for (i, (name, _)) in self.values.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(name.clone()));
        }
        ts.rparen().space().push(Token::Values).space().lparen();
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(param(value, &self.info, name));
        }
        ts.rparen();

        Ok(Statement::new(self.info.name(), ts, self.dialect))
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE of the rows matching a filter.
#[derive(Debug, Clone)]
#[must_use]
pub struct Update {
    info: Arc<TableInfo>,
    values: Vec<(String, Value)>,
    filters: PredicateGroup,
    dialect: Dialect,
}

impl Update {
    pub fn new(info: Arc<TableInfo>, row: Row) -> Self {
        let values = assignments(&info, row);
        Self {
            filters: PredicateGroup::new(Arc::clone(&info), Relation::And),
            info,
            values,
            dialect: Dialect::default(),
        }
    }

    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters = self.filters.filter(column, value);
        self
    }

    pub fn filter_op(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.filters = self.filters.filter_op(column, operator, value);
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dropped(&self) -> &[Dropped] {
        self.filters.dropped()
    }

    pub fn render(&self) -> DmlResult<Statement> {
        if self.values.is_empty() {
            return Err(DmlError::NoColumns(self.info.name().into()));
        }
        let filters = self.filters.to_tokens(true);
        if filters.is_empty() {
            return Err(DmlError::Unfiltered {
                verb: "update",
                table: self.info.name().into(),
            });
        }

        let mut ts = TokenStream::new();
        ts.push(Token::Update)
            .space()
            .push(Token::Ident(self.info.name().into()))
            .space()
            .push(Token::Set)
            .space();
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(name.clone()))
                .space()
                .push(Token::Eq)
                .space()
                .push(param(value, &self.info, name));
        }
        ts.space().push(Token::Where).space().append(&filters);

        Ok(Statement::new(self.info.name(), ts, self.dialect))
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE of the rows matching a filter.
#[derive(Debug, Clone)]
#[must_use]
pub struct Delete {
    info: Arc<TableInfo>,
    filters: PredicateGroup,
    dialect: Dialect,
}

impl Delete {
    pub fn new(info: Arc<TableInfo>) -> Self {
        Self {
            filters: PredicateGroup::new(Arc::clone(&info), Relation::And),
            info,
            dialect: Dialect::default(),
        }
    }

    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters = self.filters.filter(column, value);
        self
    }

    pub fn filter_op(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.filters = self.filters.filter_op(column, operator, value);
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dropped(&self) -> &[Dropped] {
        self.filters.dropped()
    }

    pub fn render(&self) -> DmlResult<Statement> {
        let filters = self.filters.to_tokens(true);
        if filters.is_empty() {
            return Err(DmlError::Unfiltered {
                verb: "delete",
                table: self.info.name().into(),
            });
        }

        let mut ts = TokenStream::new();
        ts.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.info.name().into()))
            .space()
            .push(Token::Where)
            .space()
            .append(&filters);

        Ok(Statement::new(self.info.name(), ts, self.dialect))
    }
}

//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings. A [`TokenStream`] can be serialized two ways:
//!
//! - [`TokenStream::serialize`] inlines every bound value as a literal
//! - [`TokenStream::template`] emits `%d`/`%f`/`%s` placeholders for bound
//!   values and escapes literal `%` as `%%`

use super::dialect::{Dialect, SqlDialect};
use crate::value::{format_float, SqlValue};

/// SQL Token - every element the builders emit.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    In,
    Between,
    Like,
    IsNull,
    IsNotNull,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,

    // === DML Keywords ===
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // === Punctuation ===
    Comma,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Identifier (table, column). Emitted bare: identifiers reaching the
    /// builders have already been checked against the schema.
    Ident(String),
    /// A bound value: a placeholder in templates, a literal when inlined.
    Param(SqlValue),
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// NULL literal
    LitNull,
    /// Function name, rendered uppercase.
    FunctionName(String),

    // === Escape Hatch ===
    /// Raw SQL passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Raw SQL is not sanitized.
    /// For user-provided values, use `Token::Param` or the literal variants,
    /// which are escaped for the target dialect.
    Raw(String),
}

impl Token {
    /// Serialize this token to a string for the given dialect, inlining
    /// bound values.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            // Keywords
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::In => "IN".into(),
            Token::Between => "BETWEEN".into(),
            Token::Like => "LIKE".into(),
            Token::IsNull => "IS NULL".into(),
            Token::IsNotNull => "IS NOT NULL".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::Limit => "LIMIT".into(),
            Token::Offset => "OFFSET".into(),

            // DML keywords
            Token::Insert => "INSERT".into(),
            Token::Into => "INTO".into(),
            Token::Values => "VALUES".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),

            // Punctuation
            Token::Comma => ",".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            // Operators
            Token::Eq => "=".into(),
            Token::Ne => "!=".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),

            // Whitespace
            Token::Space => " ".into(),

            // Dynamic - dialect-specific formatting
            Token::Ident(name) => name.clone(),
            Token::Param(value) => literal(value, dialect),
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => float_literal(*f, dialect),
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitNull => dialect.format_null().into(),
            Token::FunctionName(name) => name.to_uppercase(),

            // Escape hatch
            Token::Raw(s) => s.clone(),
        }
    }

    /// Serialize this token for a prepared template.
    fn template(&self, dialect: Dialect) -> String {
        match self {
            Token::Param(value) => value.format().placeholder().into(),
            other => other.serialize(dialect).replace('%', "%%"),
        }
    }
}

fn literal(value: &SqlValue, dialect: Dialect) -> String {
    match value {
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Float(f) => float_literal(*f, dialect),
        SqlValue::Text(s) => dialect.quote_string(s),
    }
}

fn float_literal(f: f64, dialect: Dialect) -> String {
    if f.is_finite() {
        format_float(f)
    } else {
        dialect.format_null().into()
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Serialize all tokens to a SQL string, inlining bound values.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    /// Serialize to a prepared template with `%d`/`%f`/`%s` placeholders.
    pub fn template(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.template(dialect)).collect()
    }

    /// Bound values, in placeholder order.
    pub fn params(&self) -> Vec<SqlValue> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Param(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

//! Dynamic values flowing into and out of the builder.
//!
//! [`Value`] is what callers hand to filters and what executors hand back in
//! rows. [`SqlValue`] is a value that has already been coerced against a
//! column's semantic type and is ready to be bound to a placeholder.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A row keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// A loosely typed input or output value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer coercion.
    ///
    /// Strings yield their leading integer (`"12abc"` → 12, `"abc"` → 0),
    /// floats are truncated with saturation, booleans become 1/0. Lists and
    /// NULL coerce to 0.
    pub fn to_int(&self) -> i64 {
        match self {
            Value::Null | Value::List(_) => 0,
            Value::Bool(b) => i64::from(*b),
            Value::Int(n) => *n,
            Value::Float(f) => {
                if f.is_finite() {
                    *f as i64
                } else {
                    0
                }
            }
            Value::Str(s) => leading_int(s),
        }
    }

    /// Float coercion. Non-finite results collapse to `0.0`.
    pub fn to_float(&self) -> f64 {
        match self {
            Value::Null | Value::List(_) => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Int(n) => *n as f64,
            Value::Float(f) => finite_or_zero(*f),
            Value::Str(s) => leading_float(s),
        }
    }

    /// String coercion. NULL, `false` and lists become the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null | Value::List(_) | Value::Bool(false) => String::new(),
            Value::Bool(true) => "1".into(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(finite_or_zero(*f)),
            Value::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Bound values
// =============================================================================

/// Parameter format tag, as used in prepared templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// `%d`
    Int,
    /// `%f`
    Float,
    /// `%s`
    Str,
}

impl Format {
    pub fn placeholder(self) -> &'static str {
        match self {
            Format::Int => "%d",
            Format::Float => "%f",
            Format::Str => "%s",
        }
    }

    /// Coerce a raw value into a bindable value of this format.
    pub fn coerce(self, value: &Value) -> SqlValue {
        match self {
            Format::Int => SqlValue::Int(value.to_int()),
            Format::Float => SqlValue::Float(value.to_float()),
            Format::Str => SqlValue::Text(value.to_text()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.placeholder())
    }
}

/// A sanitized scalar ready to bind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn format(&self) -> Format {
        match self {
            SqlValue::Int(_) => Format::Int,
            SqlValue::Float(_) => Format::Float,
            SqlValue::Text(_) => Format::Str,
        }
    }
}

impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Int(n) => Value::Int(n),
            SqlValue::Float(f) => Value::Float(f),
            SqlValue::Text(s) => Value::Str(s),
        }
    }
}

// =============================================================================
// Numeric parsing helpers
// =============================================================================

/// Format a float with the shortest round-tripping representation.
pub fn format_float(f: f64) -> String {
    let mut buffer = ryu::Buffer::new();
    buffer.format(f).to_string()
}

fn finite_or_zero(f: f64) -> f64 {
    if f.is_finite() {
        f
    } else {
        0.0
    }
}

fn leading_int(s: &str) -> i64 {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return 0;
    }
    t[..end].parse::<i64>().unwrap_or(if bytes[0] == b'-' {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn leading_float(s: &str) -> f64 {
    let t = s.trim_start();
    let b = t.as_bytes();
    let mut i = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let mut digits = 0;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < b.len() && b[i] == b'.' {
        i += 1;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && matches!(b[j], b'+' | b'-') {
            j += 1;
        }
        if j < b.len() && b[j].is_ascii_digit() {
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    t[..i].parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
}

//! Column descriptors and SQL type parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::Format;

/// The logical type a column's values are coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Int,
    Float,
    String,
}

impl SemanticType {
    /// Parameter format used when binding values of this type.
    pub fn format(self) -> Format {
        match self {
            SemanticType::Int => Format::Int,
            SemanticType::Float => Format::Float,
            SemanticType::String => Format::Str,
        }
    }

    fn from_base(base: &str) -> Self {
        match base {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "bit"
            | "bool" | "boolean" | "year" | "serial" => SemanticType::Int,
            "float" | "double" | "double precision" | "real" | "decimal" | "numeric" | "dec"
            | "fixed" => SemanticType::Float,
            _ => SemanticType::String,
        }
    }
}

/// A declared SQL type broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    /// Lowercased base name (`bigint`, `varchar`, `double precision`).
    pub base: String,
    pub length: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub semantic: SemanticType,
}

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([a-z]+(?:\s+precision)?)\s*(?:\(\s*(\d+)?(?:\s*,\s*(\d+))?[^)]*\))?")
        .expect("type pattern is valid")
});

/// Parse a declared column type such as `bigint(20) unsigned` or
/// `decimal(10,2)`.
///
/// Unrecognised input yields a string type with no length.
pub fn parse_sql_type(raw: &str) -> ParsedType {
    let Some(caps) = TYPE_RE.captures(raw) else {
        return ParsedType {
            base: raw.trim().to_lowercase(),
            length: None,
            scale: None,
            unsigned: false,
            semantic: SemanticType::String,
        };
    };

    let base = caps
        .get(1)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .unwrap_or_default();
    let length = caps.get(2).and_then(|m| m.as_str().parse().ok());
    let scale = caps.get(3).and_then(|m| m.as_str().parse().ok());
    let unsigned = raw.to_lowercase().contains("unsigned");
    let semantic = SemanticType::from_base(&base);

    ParsedType {
        base,
        length,
        scale,
        unsigned,
        semantic,
    }
}

/// Cached metadata about one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as reported by the database.
    pub sql_type: String,
    pub semantic_type: SemanticType,
    pub length: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary: bool,
    pub is_auto_increment: bool,
    pub is_unsigned: bool,
    /// 0-based ordinal position.
    pub position: usize,
}

impl ColumnDescriptor {
    pub fn format(&self) -> Format {
        self.semantic_type.format()
    }
}

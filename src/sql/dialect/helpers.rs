//! Shared helper functions for SQL dialect implementations.
//!
//! Dialects compose these to implement [`SqlDialect`](super::SqlDialect)
//! with minimal duplication.

use crate::sql::token::{Token, TokenStream};

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes, doubling embedded quotes.
/// Used by: SQLite
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes, backslash-escaping special characters
/// the way `mysql_real_escape_string` does.
/// Used by: MySQL
pub fn quote_string_backslash(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Escape `%`, `_` and `\` so a value matches literally inside a LIKE
/// pattern. The caller adds its own wildcards.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// LIMIT / OFFSET
// =============================================================================

/// Emit `LIMIT n OFFSET m`.
///
/// OFFSET is not valid on its own in MySQL or SQLite, so an offset without a
/// limit is paired with `unbounded`, the dialect's "no limit" literal.
pub fn emit_limit_offset_standard(
    limit: Option<u64>,
    offset: Option<u64>,
    unbounded: &str,
) -> TokenStream {
    let mut ts = TokenStream::new();

    match (limit, offset) {
        (Some(lim), _) => {
            ts.push(Token::Limit).space().push(Token::LitInt(clamp(lim)));
        }
        (None, Some(_)) => {
            ts.push(Token::Limit).space().push(Token::Raw(unbounded.into()));
        }
        (None, None) => return ts,
    }

    if let Some(off) = offset {
        ts.space()
            .push(Token::Offset)
            .space()
            .push(Token::LitInt(clamp(off)));
    }

    ts
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

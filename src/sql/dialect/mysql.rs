//! MySQL SQL dialect.
//!
//! MySQL differences from SQLite:
//! - Backslash escapes inside string literals
//! - No negative LIMIT; "no limit" is the largest unsigned 64-bit value

use super::helpers;
use super::SqlDialect;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn unbounded_limit(&self) -> &'static str {
        "18446744073709551615"
    }
}

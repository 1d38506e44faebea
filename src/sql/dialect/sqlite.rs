//! SQLite SQL dialect.
//!
//! Standard `''` quote doubling; `LIMIT -1` means "no limit".

use super::SqlDialect;

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    // Uses default quote_string ('' doubling)

    fn unbounded_limit(&self) -> &'static str {
        "-1"
    }
}

//! SQLite-backed executor and schema source.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

use super::{positional, ExecError, ExecResult, Executor};
use crate::observability::log_debug;
use crate::schema::{ColumnRow, IntrospectionError, IntrospectionResult, SchemaSource};
use crate::sql::{Dialect, Statement};
use crate::value::{Row, SqlValue, Value};

/// A single SQLite connection behind a mutex.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> ExecResult<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open(path)?),
        })
    }

    pub fn open_in_memory() -> ExecResult<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    /// Run raw SQL, e.g. DDL to set up tables.
    pub fn execute_batch(&self, sql: &str) -> ExecResult<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn conn(&self) -> ExecResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ExecError::Poisoned)
    }

    fn prepare_args(&self, stmt: &Statement) -> ExecResult<(String, Vec<SqliteValue>)> {
        if stmt.dialect() != Dialect::Sqlite {
            return Err(ExecError::DialectMismatch {
                expected: Dialect::Sqlite,
                found: stmt.dialect(),
            });
        }
        let sql = positional(&stmt.template());
        let args = stmt.args().into_iter().map(bind).collect();
        log_debug!(
            component = "db",
            event = "statement_prepared",
            table = %stmt.table(),
            sql = %sql,
        );
        Ok((sql, args))
    }
}

impl Executor for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn fetch_all(&self, stmt: &Statement) -> ExecResult<Vec<Row>> {
        let (sql, args) = self.prepare_args(stmt)?;
        let conn = self.conn()?;
        let mut prepared = conn.prepare(&sql)?;
        let names: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = prepared.query(params_from_iter(args))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in names.iter().enumerate() {
                record.insert(name.clone(), decode(name, row.get_ref(idx)?)?);
            }
            out.push(record);
        }
        Ok(out)
    }

    fn execute(&self, stmt: &Statement) -> ExecResult<u64> {
        let (sql, args) = self.prepare_args(stmt)?;
        let affected = self.conn()?.execute(&sql, params_from_iter(args))?;
        Ok(affected as u64)
    }

    fn last_insert_id(&self) -> ExecResult<i64> {
        Ok(self.conn()?.last_insert_rowid())
    }
}

impl SchemaSource for SqliteDatabase {
    fn describe_table(&self, table: &str) -> IntrospectionResult<Vec<ColumnRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| IntrospectionError::Unavailable("connection lock poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;

        let raw = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let pk_count = raw.iter().filter(|(.., pk)| *pk > 0).count();
        let rows = raw
            .into_iter()
            .map(|(name, sql_type, notnull, default, pk)| {
                // a lone INTEGER primary key aliases the rowid
                let rowid_alias = pk > 0 && pk_count == 1 && sql_type.eq_ignore_ascii_case("INTEGER");
                ColumnRow {
                    field: name,
                    sql_type,
                    null: notnull == 0 && !rowid_alias,
                    key: if pk > 0 { "PRI".into() } else { String::new() },
                    default,
                    extra: if rowid_alias {
                        "auto_increment".into()
                    } else {
                        String::new()
                    },
                }
            })
            .collect();
        Ok(rows)
    }
}

fn bind(value: SqlValue) -> SqliteValue {
    match value {
        SqlValue::Int(n) => SqliteValue::Integer(n),
        SqlValue::Float(f) => SqliteValue::Real(f),
        SqlValue::Text(s) => SqliteValue::Text(s),
    }
}

fn decode(column: &str, value: ValueRef<'_>) -> ExecResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(n) => Ok(Value::Int(n)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Str(s.to_string()))
            .map_err(|e| ExecError::Decode {
                column: column.into(),
                message: e.to_string(),
            }),
        ValueRef::Blob(bytes) => Ok(Value::Str(String::from_utf8_lossy(bytes).into_owned())),
    }
}

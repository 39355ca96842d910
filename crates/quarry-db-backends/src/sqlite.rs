//! SQLite backend using `rusqlite`.
//!
//! [`SqliteBackend`] implements [`Executor`] and [`TransactionalExecutor`] over
//! a single connection. A [`SqliteTransaction`] shares that connection and
//! rolls back on drop if it was neither committed nor rolled back.
//!
//! The backend is single-threaded: the connection is reference counted, not
//! locked. SQLite has no `day()`/`month()`/`year()` functions, so only the
//! `date` and `time` predicates apply here. It has no `TRUNCATE` statement
//! either: `Builder::truncate` fails against this backend, and an
//! unconditioned `Builder::delete` empties a table instead.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use quarry_core::{ConnectionSettings, QuarryError, QuarryResult};
use quarry_db::executor::{ExecResult, Executor, TransactionHandle, TransactionalExecutor};
use quarry_db::row::Row;
use quarry_db::value::Value;

/// A SQLite database backend.
#[derive(Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    conn: Rc<rusqlite::Connection>,
}

impl SqliteBackend {
    /// Opens the database at `path`; `:memory:` opens an in-memory database.
    ///
    /// Foreign keys are enforced, and file databases use WAL journaling.
    pub fn open(path: impl Into<PathBuf>) -> QuarryResult<Self> {
        let path = path.into();
        let in_memory = path.to_str() == Some(":memory:");
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| QuarryError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| QuarryError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "sqlite connection opened");
        Ok(Self {
            path,
            conn: Rc::new(conn),
        })
    }

    /// Opens an in-memory database.
    pub fn memory() -> QuarryResult<Self> {
        Self::open(":memory:")
    }

    /// Opens the database a configured connection names. An empty database
    /// name opens an in-memory database.
    pub fn from_settings(settings: &ConnectionSettings) -> QuarryResult<Self> {
        match settings.driver.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => {}
            other => {
                return Err(QuarryError::ConfigurationError(format!(
                    "SqliteBackend cannot serve driver {other}"
                )))
            }
        }
        if settings.database.is_empty() {
            Self::memory()
        } else {
            Self::open(&settings.database)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one or more `;`-separated statements without bindings.
    pub fn execute_batch(&self, sql: &str) -> QuarryResult<()> {
        self.conn.execute_batch(sql).map_err(map_error)
    }
}

impl Executor for SqliteBackend {
    fn select(&self, sql: &str, bindings: &[Value]) -> QuarryResult<Vec<Row>> {
        query(&self.conn, sql, bindings)
    }

    fn statement(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        execute(&self.conn, sql, bindings, false)
    }

    fn insert(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        execute(&self.conn, sql, bindings, true)
    }
}

impl TransactionalExecutor for SqliteBackend {
    type Transaction = SqliteTransaction;

    fn begin_raw(&self) -> QuarryResult<SqliteTransaction> {
        self.conn.execute_batch("BEGIN").map_err(map_error)?;
        Ok(SqliteTransaction {
            conn: Rc::clone(&self.conn),
            finished: false,
        })
    }
}

/// An open SQLite transaction.
pub struct SqliteTransaction {
    conn: Rc<rusqlite::Connection>,
    finished: bool,
}

impl Executor for SqliteTransaction {
    fn select(&self, sql: &str, bindings: &[Value]) -> QuarryResult<Vec<Row>> {
        query(&self.conn, sql, bindings)
    }

    fn statement(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        execute(&self.conn, sql, bindings, false)
    }

    fn insert(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        execute(&self.conn, sql, bindings, true)
    }
}

impl TransactionHandle for SqliteTransaction {
    fn execute(&self, sql: &str) -> QuarryResult<()> {
        self.conn.execute_batch(sql).map_err(map_error)
    }

    fn commit(&mut self) -> QuarryResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> QuarryResult<()> {
        self.finish("ROLLBACK")
    }
}

impl SqliteTransaction {
    /// Runs `COMMIT` or `ROLLBACK`. A failed statement leaves the handle open
    /// unless SQLite already ended the transaction itself.
    fn finish(&mut self, sql: &str) -> QuarryResult<()> {
        let result = self.conn.execute_batch(sql).map_err(map_error);
        self.finished = result.is_ok() || self.conn.is_autocommit();
        result
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("transaction dropped while open; rolling back");
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::error!(error = %e, "rollback of dropped transaction failed");
        }
    }
}

/// Constraint violations become [`QuarryError::IntegrityError`]; everything
/// else is a [`QuarryError::DatabaseError`].
fn map_error(e: rusqlite::Error) -> QuarryError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            QuarryError::IntegrityError(e.to_string())
        }
        _ => QuarryError::DatabaseError(e.to_string()),
    }
}

/// Binds quarry values to a prepared statement.
fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> QuarryResult<()> {
    for (i, param) in params.iter().enumerate() {
        let idx = i + 1;
        match param {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
            Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
            Value::Int(v) => stmt.raw_bind_parameter(idx, v),
            Value::Float(v) => stmt.raw_bind_parameter(idx, v),
            Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
            Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
            Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string().as_str()),
            Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string().as_str()),
            Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string().as_str()),
            Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string().as_str()),
            Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string().as_str()),
        }
        .map_err(|e| QuarryError::DatabaseError(format!("Bind error: {e}")))?;
    }
    Ok(())
}

fn convert_value(value: rusqlite::types::ValueRef<'_>) -> Value {
    match value {
        rusqlite::types::ValueRef::Null => Value::Null,
        rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
        rusqlite::types::ValueRef::Real(v) => Value::Float(v),
        rusqlite::types::ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
        rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

fn query(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> QuarryResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(map_error)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    bind_params(&mut stmt, params)?;

    let mut raw_rows = stmt.raw_query();
    let mut rows = Vec::new();
    while let Some(row) = raw_rows.next().map_err(map_error)? {
        let mut cells = Vec::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            let value = row.get_ref(i).map_err(map_error)?;
            cells.push((name.clone(), convert_value(value)));
        }
        rows.push(Row::from_pairs(cells));
    }
    Ok(rows)
}

fn execute(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
    report_insert_id: bool,
) -> QuarryResult<ExecResult> {
    let mut stmt = conn.prepare(sql).map_err(map_error)?;
    bind_params(&mut stmt, params)?;
    let count = stmt.raw_execute().map_err(map_error)?;
    Ok(ExecResult {
        rows_affected: u64::try_from(count).unwrap_or(u64::MAX),
        last_insert_id: report_insert_id.then(|| conn.last_insert_rowid()),
    })
}

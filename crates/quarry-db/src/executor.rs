//! The execution surface the query builder hands compiled SQL to.
//!
//! quarry never talks to a driver itself. Integrators implement
//! [`Executor`] (and [`TransactionalExecutor`] for transaction support); the
//! builder compiles a statement and its bindings and delegates to it.
//! Every call is synchronous and blocking.

use quarry_core::QuarryResult;

use crate::row::Row;
use crate::value::Value;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// The id generated by the last insert, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// Runs compiled SQL against a database.
///
/// `select` and `statement` are required; the insert, update and delete
/// entry points default to `statement`.
pub trait Executor {
    /// Runs a query and collects its rows.
    fn select(&self, sql: &str, bindings: &[Value]) -> QuarryResult<Vec<Row>>;

    /// Runs a statement that returns no rows (TRUNCATE, DDL and the like).
    fn statement(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult>;

    /// Runs an INSERT.
    fn insert(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        self.statement(sql, bindings)
    }

    /// Runs an UPDATE and returns the affected row count.
    fn update(&self, sql: &str, bindings: &[Value]) -> QuarryResult<u64> {
        self.statement(sql, bindings).map(|r| r.rows_affected)
    }

    /// Runs a DELETE and returns the affected row count.
    fn delete(&self, sql: &str, bindings: &[Value]) -> QuarryResult<u64> {
        self.statement(sql, bindings).map(|r| r.rows_affected)
    }
}

/// An open database transaction.
///
/// Statements routed through the handle run inside the transaction. A
/// successful [`commit`](Self::commit) or [`rollback`](Self::rollback) ends
/// it; after a failed one the handle is still open and may be retried or
/// rolled back.
pub trait TransactionHandle: Executor {
    /// Runs a control statement (e.g. `SAVEPOINT trans2`) inside the transaction.
    fn execute(&self, sql: &str) -> QuarryResult<()>;

    /// Commits the transaction.
    fn commit(&mut self) -> QuarryResult<()>;

    /// Rolls the transaction back.
    fn rollback(&mut self) -> QuarryResult<()>;
}

/// An executor that can open transactions.
pub trait TransactionalExecutor: Executor {
    /// The handle type returned by [`begin_raw`](Self::begin_raw).
    type Transaction: TransactionHandle;

    /// Begins a real database transaction.
    fn begin_raw(&self) -> QuarryResult<Self::Transaction>;
}

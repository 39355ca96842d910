//! Nested transactions over savepoints.
//!
//! [`TransactionManager`] tracks a nesting depth for one logical connection:
//!
//! - depth 0: no transaction; statements run on the root executor.
//! - depth 1: one real transaction.
//! - depth n > 1: savepoints `trans2` .. `trans{n}` inside that transaction.
//!
//! Only the outermost commit reaches the database. Inner commits lower the
//! depth and leave their savepoints to be released by the outer commit.
//!
//! # Examples
//!
//! ```ignore
//! use quarry_db::transactions::TransactionManager;
//!
//! let mut manager = TransactionManager::new(backend, grammar);
//! manager.run_in_transaction(|tx| {
//!     tx.table("accounts").where_eq("id", 1)?.update(&*tx, &[("balance", 0.into())])?;
//!     Ok(())
//! })?;
//! ```

use std::sync::Arc;

use quarry_core::{QuarryError, QuarryResult};

use crate::executor::{ExecResult, Executor, TransactionHandle, TransactionalExecutor};
use crate::grammar::Grammar;
use crate::query::builder::Builder;
use crate::row::Row;
use crate::value::Value;

/// The savepoint created when the depth reaches `level`.
fn savepoint_name(level: usize) -> String {
    format!("trans{level}")
}

/// Tracks transaction depth and routes statements to the active handle.
///
/// A manager belongs to a single caller; it is not synchronised.
pub struct TransactionManager<E: TransactionalExecutor> {
    root: E,
    transaction: Option<E::Transaction>,
    depth: usize,
    grammar: Arc<Grammar>,
}

impl<E: TransactionalExecutor> TransactionManager<E> {
    /// A manager at depth 0 over `root`.
    pub fn new(root: E, grammar: Arc<Grammar>) -> Self {
        Self {
            root,
            transaction: None,
            depth: 0,
            grammar,
        }
    }

    /// The current nesting depth.
    pub const fn transaction_level(&self) -> usize {
        self.depth
    }

    /// The grammar used by [`query`](Self::query) and [`table`](Self::table).
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// The root executor, outside any transaction.
    pub const fn root(&self) -> &E {
        &self.root
    }

    /// The executor statements should run on right now: the open transaction
    /// while the depth is positive, the root executor otherwise.
    pub fn active(&self) -> &dyn Executor {
        match &self.transaction {
            Some(transaction) if self.depth > 0 => transaction,
            _ => &self.root,
        }
    }

    /// An empty builder using this manager's grammar.
    pub fn query(&self) -> Builder {
        Builder::new(Arc::clone(&self.grammar))
    }

    /// A builder selecting from `table`.
    pub fn table(&self, table: &str) -> Builder {
        let mut query = self.query();
        query.from(table);
        query
    }

    /// Opens a transaction at depth 0, a savepoint otherwise.
    pub fn begin(&mut self) -> QuarryResult<()> {
        if self.depth == 0 {
            self.transaction = Some(self.root.begin_raw()?);
            tracing::debug!("transaction started");
        } else {
            let name = savepoint_name(self.depth + 1);
            let sql = self.grammar.compile_savepoint(&name);
            self.open_transaction()?.execute(&sql)?;
            tracing::debug!(savepoint = %name, "savepoint created");
        }
        self.depth += 1;
        Ok(())
    }

    /// Commits at depth 1; deeper commits only lower the depth.
    ///
    /// Commits with nothing open are ignored.
    pub fn commit(&mut self) -> QuarryResult<()> {
        match self.depth {
            0 => {
                tracing::debug!("commit outside a transaction ignored");
                Ok(())
            }
            1 => {
                self.open_transaction_mut()?.commit()?;
                self.transaction = None;
                self.depth = 0;
                tracing::debug!("transaction committed");
                Ok(())
            }
            depth => {
                self.depth = depth - 1;
                tracing::debug!(depth = self.depth, "nested commit deferred to outer transaction");
                Ok(())
            }
        }
    }

    /// Rolls back to `target` depth, by default one level down.
    ///
    /// Target 0 rolls back the whole transaction; any other target rolls back
    /// to the savepoint opened when leaving that depth. A target at or above
    /// the current depth does nothing.
    pub fn rollback(&mut self, target: Option<usize>) -> QuarryResult<()> {
        let Some(target) = target.or_else(|| self.depth.checked_sub(1)) else {
            return Ok(());
        };
        if target >= self.depth {
            tracing::debug!(target, depth = self.depth, "rollback target out of range; ignored");
            return Ok(());
        }

        if target == 0 {
            self.open_transaction_mut()?.rollback()?;
            self.transaction = None;
            self.depth = 0;
            tracing::debug!("transaction rolled back");
        } else {
            let name = savepoint_name(target + 1);
            let sql = self.grammar.compile_savepoint_rollback(&name);
            self.open_transaction()?.execute(&sql)?;
            self.depth = target;
            tracing::debug!(savepoint = %name, "rolled back to savepoint");
        }
        Ok(())
    }

    /// Runs `callback` one level deeper.
    ///
    /// On success every level the call opened is committed and the
    /// callback's value is returned. If the callback or the final commit
    /// fails, the depth is rolled back to where it was on entry and that
    /// error is returned.
    ///
    /// # Errors
    ///
    /// [`QuarryError::UnresolvedTransactionCallback`] when the callback
    /// succeeds but has already closed the level opened for it.
    pub fn run_in_transaction<T, F>(&mut self, callback: F) -> QuarryResult<T>
    where
        F: FnOnce(&mut Self) -> QuarryResult<T>,
    {
        let entry = self.depth;
        self.begin()?;

        let outcome = callback(self).and_then(|value| {
            if self.depth <= entry {
                return Err(QuarryError::UnresolvedTransactionCallback(format!(
                    "callback returned at depth {} after starting at depth {}",
                    self.depth,
                    entry + 1
                )));
            }
            while self.depth > entry {
                self.commit()?;
            }
            Ok(value)
        });

        if outcome.is_err() && self.depth > entry {
            if let Err(rollback_err) = self.rollback(Some(entry)) {
                tracing::error!(
                    error = %rollback_err,
                    "rollback after failed transaction callback failed"
                );
            }
        }
        outcome
    }

    fn open_transaction(&self) -> QuarryResult<&E::Transaction> {
        self.transaction.as_ref().ok_or_else(|| {
            QuarryError::OperationalError(format!(
                "no open transaction at depth {}",
                self.depth
            ))
        })
    }

    fn open_transaction_mut(&mut self) -> QuarryResult<&mut E::Transaction> {
        self.transaction.as_mut().ok_or_else(|| {
            QuarryError::OperationalError("no open transaction to finish".to_string())
        })
    }
}

impl<E: TransactionalExecutor> Executor for TransactionManager<E> {
    fn select(&self, sql: &str, bindings: &[Value]) -> QuarryResult<Vec<Row>> {
        self.active().select(sql, bindings)
    }

    fn statement(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        self.active().statement(sql, bindings)
    }

    fn insert(&self, sql: &str, bindings: &[Value]) -> QuarryResult<ExecResult> {
        self.active().insert(sql, bindings)
    }

    fn update(&self, sql: &str, bindings: &[Value]) -> QuarryResult<u64> {
        self.active().update(sql, bindings)
    }

    fn delete(&self, sql: &str, bindings: &[Value]) -> QuarryResult<u64> {
        self.active().delete(sql, bindings)
    }
}

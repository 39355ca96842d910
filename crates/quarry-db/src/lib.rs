//! # quarry-db
//!
//! A fluent SQL query builder. A [`Builder`](query::Builder) accumulates
//! clauses through chained calls; a [`Grammar`](grammar::Grammar) renders it
//! into SQL text plus the bound values in placeholder order. Execution is
//! delegated to an [`Executor`](executor::Executor) supplied by the caller, and
//! [`TransactionManager`](transactions::TransactionManager) layers nested
//! transactions over savepoints.
//!
//! ## Module Overview
//!
//! - [`query`] - the builder, join sub-builder and clause node types
//! - [`grammar`] - the base grammar and the MySQL dialect
//! - [`executor`] - the execution surface implemented by backends
//! - [`transactions`] - savepoint-based nested transactions
//! - [`value`] - the [`Value`](value::Value) enum
//! - [`row`] - result rows

// too_many_lines: the grammar's predicate match is long by nature
// needless_pass_by_value: builder methods take owned binding lists
// return_self_not_must_use: chained builder methods are self-documenting
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::doc_markdown)]

pub mod executor;
pub mod grammar;
pub mod query;
pub mod row;
pub mod transactions;
pub mod value;

pub use executor::{ExecResult, Executor, TransactionHandle, TransactionalExecutor};
pub use grammar::{Dialect, Grammar, SelectComponent};
pub use query::{Builder, JoinClause, JoinType, SubQuery};
pub use quarry_core::{QuarryError, QuarryResult};
pub use row::{FromValue, Row};
pub use transactions::TransactionManager;
pub use value::Value;

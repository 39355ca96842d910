//! # quarry
//!
//! A fluent SQL query builder.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on `quarry`
//! for everything, or on the individual crates for finer-grained control.
//!
//! ```
//! use std::sync::Arc;
//! use quarry::prelude::*;
//!
//! let mut q = Builder::new(Arc::new(Grammar::mysql()));
//! q.from("users").where_in("id", [1, 2, 3]).unwrap();
//! assert_eq!(q.to_sql(), "select * from `users` where `id` in (?, ?, ?)");
//! ```

/// Errors, settings and logging.
pub use quarry_core as core;

/// The query builder, grammars, executors and transactions.
pub use quarry_db as db;

/// Database backends.
pub use quarry_db_backends as backends;

// Third-party re-exports for user convenience
pub use chrono;
pub use serde_json;
pub use tracing;

/// The types most programs need.
pub mod prelude {
    pub use quarry_core::{QuarryError, QuarryResult, Settings};
    pub use quarry_db::{
        Builder, Dialect, ExecResult, Executor, Grammar, JoinClause, Row, SubQuery,
        TransactionManager, TransactionalExecutor, Value,
    };
    #[cfg(feature = "sqlite")]
    pub use quarry_db_backends::SqliteBackend;
}

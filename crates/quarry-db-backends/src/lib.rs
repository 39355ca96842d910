//! # quarry-db-backends
//!
//! Executors that run quarry's compiled SQL against a real database.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteBackend, SqliteTransaction};

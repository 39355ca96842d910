//! Core error types for quarry.
//!
//! [`QuarryError`] covers the two failure families of the query engine:
//! construction errors, raised by the fluent builder when it is handed input it
//! cannot represent, and execution errors, surfaced by whatever executes the
//! compiled SQL. Configuration and I/O errors come from the settings loader.

use thiserror::Error;

/// The primary error type for quarry.
#[derive(Error, Debug)]
pub enum QuarryError {
    // ── Construction errors ──────────────────────────────────────────
    /// A predicate was given a value it cannot compare against.
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// A sub-query argument could not be embedded in the outer query.
    #[error("Illegal sub query: {0}")]
    IllegalSubquery(String),

    /// A null comparison used an operator other than `=` or `!=`.
    #[error("Illegal operator and value combination: {0}")]
    IllegalNullOperator(String),

    /// A transaction callback left the transaction it was given in a state
    /// that can be neither committed nor rolled back.
    #[error("Unresolved transaction callback: {0}")]
    UnresolvedTransactionCallback(String),

    // ── Execution errors ─────────────────────────────────────────────
    /// A generic database error reported by the driver.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A constraint violation (unique, foreign key, not null).
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// Connection or transaction-state failure.
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// A requested row or column was not found.
    #[error("Does not exist: {0}")]
    DoesNotExist(String),

    // ── Configuration ────────────────────────────────────────────────
    /// Settings could not be loaded or a named connection is missing.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl QuarryError {
    /// Returns `true` for errors caused by misuse of the fluent API.
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedValueType(_)
                | Self::IllegalSubquery(_)
                | Self::IllegalNullOperator(_)
                | Self::UnresolvedTransactionCallback(_)
        )
    }

    /// Returns `true` for errors reported while running a statement.
    pub const fn is_execution_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_)
                | Self::IntegrityError(_)
                | Self::OperationalError(_)
                | Self::DoesNotExist(_)
        )
    }
}

/// A convenience type alias for results that may produce a [`QuarryError`].
pub type QuarryResult<T> = Result<T, QuarryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuarryError::IllegalNullOperator("`age` > null".into());
        assert_eq!(
            err.to_string(),
            "Illegal operator and value combination: `age` > null"
        );

        let err = QuarryError::DatabaseError("no such table: users".into());
        assert_eq!(err.to_string(), "Database error: no such table: users");
    }

    #[test]
    fn test_construction_errors_are_classified() {
        assert!(QuarryError::UnsupportedValueType("json".into()).is_construction_error());
        assert!(QuarryError::IllegalSubquery(String::new()).is_construction_error());
        assert!(QuarryError::UnresolvedTransactionCallback(String::new()).is_construction_error());
        assert!(!QuarryError::UnsupportedValueType("json".into()).is_execution_error());
    }

    #[test]
    fn test_execution_errors_are_classified() {
        assert!(QuarryError::IntegrityError("UNIQUE".into()).is_execution_error());
        assert!(QuarryError::OperationalError("locked".into()).is_execution_error());
        assert!(!QuarryError::ConfigurationError("x".into()).is_execution_error());
        assert!(!QuarryError::ConfigurationError("x".into()).is_construction_error());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: QuarryError = io_err.into();
        assert!(matches!(err, QuarryError::IoError(_)));
    }

    #[test]
    fn test_result_alias() {
        fn returns_err() -> QuarryResult<()> {
            Err(QuarryError::DoesNotExist("aggregate".into()))
        }
        assert!(returns_err().is_err());
    }
}

//! # Error Taxonomy
//!
//! Every public operation returns [`Result`], whose error side is [`DbError`].
//! The variants map one-to-one onto the failure classes a caller has to tell
//! apart:
//!
//! | Variant | Raised by | Effect on state |
//! |---------|-----------|-----------------|
//! | `Attach` | attach / initialize | no attachment is published |
//! | `Parse`, `Bind`, `Catalog` | prepare | captured on the statement |
//! | `Parameter` | execute | none, statement stays usable |
//! | `InvalidatedStatement` | execute | statement is permanently dead |
//! | `TransactionState` | begin / commit / rollback | current transaction untouched |
//! | `CommitFailed` | commit | transaction was rolled back |
//! | `DatabaseDetached` | any call after detach | none |
//!
//! Checkpoint failures during shutdown never reach a caller; they are logged
//! and reported through `ShutdownOutcome` instead.
//!
//! `DbError` is `Clone` because a statement that failed to compile hands the
//! same error back on every execute. Storage reports are kept behind an `Arc`
//! for that reason.

use crate::mvcc::TxnId;
use crate::types::DataType;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("failed to attach database '{path}': {reason}")]
    Attach { path: String, reason: String },
    #[error("parser error: {0}")]
    Parse(String),
    #[error("binder error: {0}")]
    Bind(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("{0}")]
    Parameter(ParameterError),
    #[error("prepared statement is no longer valid: {0}")]
    InvalidatedStatement(InvalidationCause),
    #[error("transaction error: {0}")]
    TransactionState(String),
    #[error("prepared statement '{0}' does not exist")]
    StatementNotFound(String),
    #[error("storage error: {0:#}")]
    Storage(Arc<eyre::Report>),
    #[error("commit failed, transaction {txn_id} was rolled back: {report:#}")]
    CommitFailed {
        txn_id: TxnId,
        report: Arc<eyre::Report>,
    },
    #[error("cannot execute {0} on a read-only database")]
    ReadOnly(&'static str),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("database '{0}' has been detached")]
    DatabaseDetached(String),
}

impl DbError {
    pub(crate) fn storage(report: eyre::Report) -> Self {
        DbError::Storage(Arc::new(report))
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(self, DbError::InvalidatedStatement(_))
    }

    pub fn is_parameter_error(&self) -> bool {
        matches!(self, DbError::Parameter(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    Count { expected: usize, got: usize },
    Type {
        index: usize,
        expected: DataType,
        value: String,
    },
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Count { expected, got } => write!(
                f,
                "wrong number of parameters: statement expects {} but {} were supplied",
                expected, got
            ),
            ParameterError::Type {
                index,
                expected,
                value,
            } => write!(
                f,
                "parameter ${} expects {} but got {} which cannot be converted",
                index, expected, value
            ),
        }
    }
}

/// Why a prepared statement stopped being executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationCause {
    ConnectionClosed,
    DatabaseDetached,
    TransactionRolledBack(TxnId),
    EntryInvalidated(String),
    Released(String),
}

impl fmt::Display for InvalidationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationCause::ConnectionClosed => f.write_str("its connection was closed"),
            InvalidationCause::DatabaseDetached => f.write_str("its database was detached"),
            InvalidationCause::TransactionRolledBack(id) => {
                write!(f, "transaction {} it was prepared in was rolled back", id)
            }
            InvalidationCause::EntryInvalidated(name) => {
                write!(f, "catalog entry '{}' it depends on no longer exists", name)
            }
            InvalidationCause::Released(name) => {
                write!(f, "statement '{}' was deallocated", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_reports_keep_their_context_chain() {
        use eyre::WrapErr;
        let report = Err::<(), _>(std::io::Error::other("disk full"))
            .wrap_err("failed to write checkpoint")
            .unwrap_err();
        let err = DbError::storage(report);
        let text = err.to_string();
        assert!(text.contains("failed to write checkpoint"));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn cloned_errors_render_identically() {
        let err = DbError::Parse("syntax error at or near \"SELEC\"".to_string());
        assert_eq!(err.to_string(), err.clone().to_string());
    }

    #[test]
    fn parameter_count_message_names_both_counts() {
        let err = DbError::Parameter(ParameterError::Count {
            expected: 2,
            got: 3,
        });
        assert!(err.to_string().contains("expects 2 but 3"));
        assert!(err.is_parameter_error());
    }
}

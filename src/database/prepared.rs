//! # Prepared Statements
//!
//! A prepared statement is compiled once against the catalog visible at
//! prepare time and then executed many times with different arguments.
//!
//! ## State Machine
//!
//! ```text
//! Compiling ──ok──> Ready ──(validity lost)──> Invalidated
//!     │
//!     └──error──> Failed      (repeats the captured error on every execute)
//! ```
//!
//! `Invalidated` is never stored: validity is re-derived lazily before every
//! execution, so a statement that lost its footing fails on each attempt
//! and never rebinds behind the caller's back.
//!
//! ## Validity
//!
//! A ready statement may run only while all of these hold:
//!
//! 1. it has not been released (`DEALLOCATE`)
//! 2. its owning connection is alive
//! 3. the database has not been detached
//! 4. the explicit transaction it was prepared in (if any) did not roll back
//! 5. no catalog entry its plan depends on is invalidated, or dropped by a
//!    commit the running transaction can see
//!
//! ## Execute Order
//!
//! ```text
//! Failed?          -> captured error
//! argument count   -> ParameterError::Count   (no catalog access)
//! argument types   -> ParameterError::Type    (implicit casts only)
//! validity         -> InvalidatedStatement(cause)
//! run              -> current transaction, or an implicit one
//! ```
//!
//! ## Ownership
//!
//! The statement holds only a weak reference to its connection. Dropping the
//! handle removes its name from the connection's registry.

use super::connection::ConnectionInner;
use super::ExecuteResult;
use crate::error::{DbError, InvalidationCause, ParameterError, Result};
use crate::mvcc::{TxnId, TxnOutcome, TxnState};
use crate::sql::BoundPlan;
use crate::types::{DataType, OwnedValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

#[derive(Debug)]
pub(crate) enum StatementState {
    Ready(BoundPlan),
    Failed(DbError),
}

#[derive(Debug)]
pub(crate) struct StatementInner {
    pub(crate) name: String,
    pub(crate) sql: String,
    pub(crate) state: StatementState,
    pub(crate) creation_txn: Option<TxnId>,
    pub(crate) txn_outcome: Option<Arc<TxnOutcome>>,
    released: AtomicBool,
}

impl StatementInner {
    pub(crate) fn ready(
        name: String,
        sql: String,
        plan: BoundPlan,
        txn_outcome: Option<Arc<TxnOutcome>>,
    ) -> Self {
        Self {
            name,
            sql,
            state: StatementState::Ready(plan),
            creation_txn: txn_outcome.as_ref().map(|o| o.id()),
            txn_outcome,
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn failed(name: String, sql: String, error: DbError) -> Self {
        Self {
            name,
            sql,
            state: StatementState::Failed(error),
            creation_txn: None,
            txn_outcome: None,
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn plan(&self) -> Result<&BoundPlan> {
        match &self.state {
            StatementState::Ready(plan) => Ok(plan),
            StatementState::Failed(err) => Err(err.clone()),
        }
    }

    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Coerces `args` into the declared parameter types.
    pub(crate) fn coerce_arguments(&self, args: &[OwnedValue]) -> Result<Vec<OwnedValue>> {
        let plan = self.plan()?;
        let expected = plan.parameter_types.len();
        if args.len() != expected {
            return Err(DbError::Parameter(ParameterError::Count {
                expected,
                got: args.len(),
            }));
        }

        let mut coerced = Vec::with_capacity(args.len());
        for (idx, (value, declared)) in args.iter().zip(&plan.parameter_types).enumerate() {
            let value = match declared {
                Some(target) => value.coerce(*target).ok_or_else(|| {
                    DbError::Parameter(ParameterError::Type {
                        index: idx + 1,
                        expected: *target,
                        value: value.to_string(),
                    })
                })?,
                None => value.clone(),
            };
            coerced.push(value);
        }
        Ok(coerced)
    }

    pub(crate) fn validate(&self, conn: &ConnectionInner) -> Result<()> {
        let cause = if self.released.load(Ordering::Acquire) {
            Some(InvalidationCause::Released(self.name.clone()))
        } else if !conn.is_alive() {
            Some(InvalidationCause::ConnectionClosed)
        } else if conn.database().is_detached() {
            Some(InvalidationCause::DatabaseDetached)
        } else if let Some(outcome) = self
            .txn_outcome
            .as_ref()
            .filter(|o| o.state() == TxnState::RolledBack)
        {
            Some(InvalidationCause::TransactionRolledBack(outcome.id()))
        } else {
            let snapshot = conn.active_snapshot();
            self.plan()?
                .dependencies
                .iter()
                .find(|entry| entry.is_invalidated() || entry.is_dropped_for(snapshot.as_ref()))
                .map(|entry| InvalidationCause::EntryInvalidated(entry.name().to_string()))
        };

        match cause {
            Some(cause) => {
                debug!(statement = %self.name, cause = %cause, "prepared statement invalidated");
                Err(DbError::InvalidatedStatement(cause))
            }
            None => Ok(()),
        }
    }
}

/// Handle to a statement prepared on a [`Connection`](super::Connection).
pub struct PreparedStatement {
    conn: Weak<ConnectionInner>,
    inner: Arc<StatementInner>,
}

impl std::fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("name", &self.inner.name)
            .field("sql", &self.inner.sql)
            .field("success", &self.success())
            .finish()
    }
}

impl PreparedStatement {
    pub(crate) fn new(conn: Weak<ConnectionInner>, inner: Arc<StatementInner>) -> Self {
        Self { conn, inner }
    }

    pub(crate) fn belongs_to(&self, conn: &Arc<ConnectionInner>) -> bool {
        std::ptr::eq(self.conn.as_ptr(), Arc::as_ptr(conn))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn sql(&self) -> &str {
        &self.inner.sql
    }

    pub fn success(&self) -> bool {
        matches!(self.inner.state, StatementState::Ready(_))
    }

    pub fn error(&self) -> Option<&DbError> {
        match &self.inner.state {
            StatementState::Failed(err) => Some(err),
            StatementState::Ready(_) => None,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types().len()
    }

    /// Declared parameter types; `None` accepts any value.
    pub fn parameter_types(&self) -> &[Option<DataType>] {
        match &self.inner.state {
            StatementState::Ready(plan) => &plan.parameter_types,
            StatementState::Failed(_) => &[],
        }
    }

    /// Id of the explicit transaction this statement was prepared in.
    pub fn creation_transaction(&self) -> Option<TxnId> {
        self.inner.creation_txn
    }

    pub fn execute(&self, params: &[OwnedValue]) -> Result<ExecuteResult> {
        let args = self.inner.coerce_arguments(params)?;
        let conn = self
            .conn
            .upgrade()
            .ok_or(DbError::InvalidatedStatement(InvalidationCause::ConnectionClosed))?;
        conn.run_statement(&self.inner, &args)
    }
}

impl Drop for PreparedStatement {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.upgrade() {
            conn.unregister(&self.inner);
        }
    }
}

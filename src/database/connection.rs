//! # Connection
//!
//! A connection is bound to one attached database, owns at most one active
//! transaction and keeps a registry of its prepared statements by name.
//!
//! ## Autocommit
//!
//! Outside `BEGIN ... COMMIT` every statement runs in an implicit
//! transaction that commits when the statement succeeds and rolls back when
//! it fails.
//!
//! ## Statement Registry
//!
//! ```text
//! prepare(sql)              -> "__keeldb_prepared_<n>"  (handle owns it)
//! PREPARE name AS ...       -> "name"                   (registry owns it)
//! EXECUTE name(args)        -> registry lookup, StatementNotFound if gone
//! DEALLOCATE name           -> removed and marked released
//! drop(PreparedStatement)   -> removed
//! drop(Connection)          -> active transaction rolled back, registry cleared
//! ```

use super::prepared::{PreparedStatement, StatementInner};
use super::{AttachedDatabase, ExecuteResult};
use crate::config::PREPARED_NAME_PREFIX;
use crate::error::{DbError, InvalidationCause, Result};
use crate::mvcc::{Snapshot, Transaction, TxnState};
use crate::sql::binder::{BoundExpr, BoundStatement};
use crate::sql::{parse_statement, split_statements, Binder, Executor};
use crate::types::OwnedValue;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ConnectionInner {
    id: u64,
    db: Arc<AttachedDatabase>,
    txn: Mutex<Option<Transaction>>,
    registry: Mutex<HashMap<String, Arc<StatementInner>>>,
    alive: AtomicBool,
    next_statement: AtomicU64,
}

pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("database", &self.inner.db.name())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(db: Arc<AttachedDatabase>) -> Result<Self> {
        db.ensure_attached()?;
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(connection = id, database = db.name(), "connection opened");
        Ok(Self {
            inner: Arc::new(ConnectionInner {
                id,
                db,
                txn: Mutex::new(None),
                registry: Mutex::new(HashMap::new()),
                alive: AtomicBool::new(true),
                next_statement: AtomicU64::new(1),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn database_name(&self) -> &str {
        self.inner.db.name()
    }

    /// Compiles one statement. Errors are captured on the returned handle.
    pub fn prepare(&self, sql: &str) -> PreparedStatement {
        let name = self.inner.generate_name();
        self.wrap(self.inner.prepare(name, sql))
    }

    /// Like [`Connection::prepare`], registering the statement as `name`.
    pub fn prepare_named(&self, name: &str, sql: &str) -> PreparedStatement {
        self.wrap(self.inner.prepare(name.to_string(), sql))
    }

    fn wrap(&self, inner: Arc<StatementInner>) -> PreparedStatement {
        PreparedStatement::new(Arc::downgrade(&self.inner), inner)
    }

    pub fn execute(&self, stmt: &PreparedStatement, params: &[OwnedValue]) -> Result<ExecuteResult> {
        if !stmt.belongs_to(&self.inner) {
            return Err(DbError::Execution(format!(
                "prepared statement '{}' belongs to another connection",
                stmt.name()
            )));
        }
        stmt.execute(params)
    }

    /// Prepares and executes a single statement.
    pub fn query(&self, sql: &str, params: &[OwnedValue]) -> Result<ExecuteResult> {
        let stmt = self.prepare(sql);
        stmt.execute(params)
    }

    /// Runs several parameterless statements in order, stopping at the first
    /// error.
    pub fn execute_batch(&self, sql: &str) -> Result<Vec<ExecuteResult>> {
        let mut results = Vec::new();
        for statement in split_statements(sql) {
            results.push(self.query(statement, &[])?);
        }
        Ok(results)
    }

    pub fn begin(&self) -> Result<()> {
        self.inner.begin()
    }

    pub fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }

    pub fn checkpoint(&self, force: bool) -> Result<()> {
        self.inner.checkpoint(force)
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    /// Names currently in the statement registry, sorted.
    pub fn registered_statements(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.registry.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inner.close();
    }
}

fn is_active(txn: &Option<Transaction>) -> bool {
    matches!(txn, Some(t) if t.state() == TxnState::Active)
}

impl ConnectionInner {
    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn database(&self) -> &AttachedDatabase {
        &self.db
    }

    fn in_transaction(&self) -> bool {
        is_active(&self.txn.lock())
    }

    fn generate_name(&self) -> String {
        let n = self.next_statement.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", PREPARED_NAME_PREFIX, n)
    }

    fn prepare(&self, name: String, sql: &str) -> Arc<StatementInner> {
        match self.compile(&name, sql) {
            Ok(stmt) => stmt,
            Err(err) => {
                debug!(connection = self.id, statement = %name, error = %err, "prepare failed");
                Arc::new(StatementInner::failed(name, sql.to_string(), err))
            }
        }
    }

    fn compile(&self, name: &str, sql: &str) -> Result<Arc<StatementInner>> {
        self.db.ensure_attached()?;

        let statements = split_statements(sql);
        let text = match statements.as_slice() {
            [one] => *one,
            [] => return Err(DbError::Parse("no statement to prepare".to_string())),
            _ => {
                return Err(DbError::Parse(format!(
                    "cannot prepare multiple statements at once, got {}",
                    statements.len()
                )))
            }
        };
        let statement = parse_statement(text).map_err(|e| DbError::Parse(format!("{:#}", e)))?;

        let (snapshot, outcome) = {
            let guard = self.txn.lock();
            match guard.as_ref() {
                Some(txn) if txn.state() == TxnState::Active => {
                    (txn.snapshot(), Some(txn.outcome()))
                }
                _ => (self.db.transaction_manager().committed_snapshot(), None),
            }
        };
        let plan = Binder::new(self.db.catalog(), snapshot).bind(statement)?;

        let mut registry = self.registry.lock();
        if registry.contains_key(name) {
            return Err(DbError::Execution(format!(
                "prepared statement '{}' already exists",
                name
            )));
        }
        let stmt = Arc::new(StatementInner::ready(
            name.to_string(),
            text.to_string(),
            plan,
            outcome,
        ));
        registry.insert(name.to_string(), Arc::clone(&stmt));
        debug!(
            connection = self.id,
            statement = name,
            parameters = stmt.plan()?.parameter_types.len(),
            creation_txn = ?stmt.creation_txn,
            "statement prepared"
        );
        Ok(stmt)
    }

    pub(crate) fn unregister(&self, stmt: &Arc<StatementInner>) {
        let mut registry = self.registry.lock();
        if registry
            .get(&stmt.name)
            .is_some_and(|registered| Arc::ptr_eq(registered, stmt))
        {
            registry.remove(&stmt.name);
            debug!(connection = self.id, statement = %stmt.name, "statement released");
        }
    }

    /// Executes an already coerced argument list against `stmt`.
    pub(crate) fn run_statement(&self, stmt: &StatementInner, args: &[OwnedValue]) -> Result<ExecuteResult> {
        stmt.validate(self)?;
        let plan = stmt.plan()?;

        match &plan.statement {
            BoundStatement::Begin => self.begin().map(|_| ExecuteResult::Begin),
            BoundStatement::Commit => self.commit().map(|_| ExecuteResult::Commit),
            BoundStatement::Rollback => self.rollback().map(|_| ExecuteResult::Rollback),
            BoundStatement::Checkpoint { force } => {
                self.checkpoint(*force).map(|_| ExecuteResult::Checkpoint)
            }
            BoundStatement::Prepare { name, body_sql } => {
                let prepared = self.prepare(name.clone(), body_sql);
                prepared.plan()?;
                Ok(ExecuteResult::Prepare { name: name.clone() })
            }
            BoundStatement::Execute { name, args: exprs } => self.execute_named(name, exprs, args),
            BoundStatement::Deallocate { name } => {
                let removed = self.registry.lock().remove(name);
                match removed {
                    Some(stmt) => {
                        stmt.release();
                        debug!(connection = self.id, statement = %name, "statement deallocated");
                        Ok(ExecuteResult::Deallocate { name: name.clone() })
                    }
                    None => Err(DbError::StatementNotFound(name.clone())),
                }
            }
            statement => self.run_in_transaction(statement, args),
        }
    }

    fn execute_named(&self, name: &str, exprs: &[BoundExpr], outer: &[OwnedValue]) -> Result<ExecuteResult> {
        let target = self
            .registry
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::StatementNotFound(name.to_string()))?;
        if matches!(
            target.plan().map(|plan| &plan.statement),
            Ok(BoundStatement::Execute { .. })
        ) {
            return Err(DbError::Execution(format!(
                "prepared statement '{}' is itself an EXECUTE and cannot be run by name",
                name
            )));
        }

        let executor = Executor::new(self.db.catalog(), outer);
        let values = exprs
            .iter()
            .map(|e| executor.evaluate(e, &[]))
            .collect::<Result<Vec<_>>>()?;
        let args = target.coerce_arguments(&values)?;
        self.run_statement(&target, &args)
    }

    fn run_in_transaction(&self, statement: &BoundStatement, args: &[OwnedValue]) -> Result<ExecuteResult> {
        self.db.ensure_attached()?;
        if statement.is_write() && self.db.config().read_only() {
            return Err(DbError::ReadOnly(statement.kind()));
        }

        let executor = Executor::new(self.db.catalog(), args);
        let mut guard = self.txn.lock();
        if let Some(txn) = guard.as_mut().filter(|t| t.state() == TxnState::Active) {
            return executor.execute(statement, txn);
        }
        *guard = None;
        drop(guard);

        let manager = self.db.transaction_manager();
        let mut txn = manager.begin_txn()?;
        match executor.execute(statement, &mut txn) {
            Ok(result) => {
                manager.commit(&mut txn, self.db.catalog(), self.db.storage())?;
                Ok(result)
            }
            Err(err) => {
                manager.rollback(&mut txn, self.db.catalog())?;
                Err(err)
            }
        }
    }

    /// Snapshot of the explicit transaction, if one is active.
    pub(crate) fn active_snapshot(&self) -> Option<Snapshot> {
        self.txn
            .lock()
            .as_ref()
            .filter(|txn| txn.state() == TxnState::Active)
            .map(Transaction::snapshot)
    }

    fn begin(&self) -> Result<()> {
        self.db.ensure_attached()?;
        let mut guard = self.txn.lock();
        if is_active(&guard) {
            return Err(DbError::TransactionState(
                "cannot start a transaction within a transaction".to_string(),
            ));
        }
        let txn = self.db.transaction_manager().begin_txn()?;
        debug!(connection = self.id, txn_id = txn.id(), "explicit transaction started");
        *guard = Some(txn);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut guard = self.txn.lock();
        if !is_active(&guard) {
            return Err(DbError::TransactionState(
                "cannot commit - no transaction is active".to_string(),
            ));
        }
        self.db.ensure_attached()?;
        let Some(txn) = guard.as_mut() else {
            return Ok(());
        };
        self.db
            .transaction_manager()
            .commit(txn, self.db.catalog(), self.db.storage())?;
        *guard = None;
        Ok(())
    }

    /// Rolls back the active transaction. After a failed commit this only
    /// clears the finished transaction.
    fn rollback(&self) -> Result<()> {
        let mut guard = self.txn.lock();
        let Some(mut txn) = guard.take() else {
            return Err(DbError::TransactionState(
                "cannot rollback - no transaction is active".to_string(),
            ));
        };
        self.db
            .transaction_manager()
            .rollback(&mut txn, self.db.catalog())
    }

    fn checkpoint(&self, force: bool) -> Result<()> {
        self.db.ensure_attached()?;
        if self.in_transaction() {
            return Err(DbError::TransactionState(
                "cannot CHECKPOINT inside a transaction".to_string(),
            ));
        }
        self.db.checkpoint(force)
    }

    fn close(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(mut txn) = self.txn.lock().take() {
            if txn.state() == TxnState::Active {
                if let Err(err) = self.db.transaction_manager().rollback(&mut txn, self.db.catalog()) {
                    warn!(connection = self.id, error = %err, "rollback on close failed");
                }
            }
        }
        let released = {
            let mut registry = self.registry.lock();
            let n = registry.len();
            registry.clear();
            n
        };
        debug!(
            connection = self.id,
            statements = released,
            cause = %InvalidationCause::ConnectionClosed,
            "connection closed"
        );
    }
}

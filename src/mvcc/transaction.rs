//! # Transaction Management
//!
//! The transaction manager hands out transaction ids, tracks which
//! transactions are active, and drives commit and rollback of the catalog
//! changes a transaction recorded.
//!
//! ## Transaction Identifiers
//!
//! `TxnId` is a 64-bit monotonically increasing integer allocated from a
//! global atomic counter. Commit timestamps come from the same counter, so
//! a snapshot taken at `read_ts` sees exactly the commits with a smaller
//! timestamp.
//!
//! ## Slot Array
//!
//! Active transactions occupy a fixed-size slot array:
//!
//! ```text
//! TransactionManager {
//!     global_ts: AtomicU64,                          // next timestamp
//!     active_slots: [AtomicU64; MAX_CONCURRENT_TXNS], // 0 = free, else start ts
//!     slot_lock: Mutex<()>,                          // begin / commit ordering
//! }
//! ```
//!
//! `begin_txn` and the publishing half of `commit` both run under
//! `slot_lock`. A transaction that begins therefore either sees all of a
//! concurrent commit or none of it.
//!
//! ## Commit
//!
//! ```text
//! commit(txn)
//!   ├─ txn must be Active                       (else TransactionState)
//!   ├─ storage.commit(txn.id, changes)          (veto -> rollback, CommitFailed)
//!   ├─ lock slot_lock, allocate commit_ts
//!   ├─ catalog.commit(txn.id, changes, ts)      (stamps become committed)
//!   └─ release slot, state = Committed
//! ```
//!
//! ## Rollback
//!
//! Every entry created under the transaction is invalidated and hidden, drop
//! marks are cleared and inserted rows are removed. The shared
//! [`TxnOutcome`] flips to `RolledBack`, which is how prepared statements
//! compiled inside the transaction learn that their snapshot is gone.

use crate::config::{BOOTSTRAP_TXN_ID, MAX_CONCURRENT_TXNS};
use crate::error::{DbError, Result};
use crate::schema::{Catalog, CatalogChange};
use crate::storage::StorageManager;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub type TxnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxnState {
    #[default]
    Active,
    Committed,
    RolledBack,
}

impl TxnState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => TxnState::Committed,
            2 => TxnState::RolledBack,
            _ => TxnState::Active,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TxnState::Active => 0,
            TxnState::Committed => 1,
            TxnState::RolledBack => 2,
        }
    }
}

/// Read view of a transaction: its own id plus the timestamp it reads at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub txn_id: TxnId,
    pub read_ts: TxnId,
}

impl Snapshot {
    pub fn new(txn_id: TxnId, read_ts: TxnId) -> Self {
        Self { txn_id, read_ts }
    }

    /// Snapshot of committed state only, as of `read_ts`.
    pub fn committed(read_ts: TxnId) -> Self {
        Self {
            txn_id: BOOTSTRAP_TXN_ID,
            read_ts,
        }
    }
}

/// Version information attached to catalog entries and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionStamp {
    owner: Option<TxnId>,
    commit_ts: TxnId,
}

impl VersionStamp {
    pub fn uncommitted(owner: TxnId) -> Self {
        Self {
            owner: Some(owner),
            commit_ts: 0,
        }
    }

    pub fn committed(commit_ts: TxnId) -> Self {
        Self {
            owner: None,
            commit_ts,
        }
    }

    pub fn bootstrap() -> Self {
        Self::committed(BOOTSTRAP_TXN_ID)
    }

    pub fn owner(&self) -> Option<TxnId> {
        self.owner
    }

    pub fn is_committed(&self) -> bool {
        self.owner.is_none()
    }

    /// Commit timestamp; meaningless while the version is uncommitted.
    pub fn commit_ts(&self) -> TxnId {
        self.commit_ts
    }

    pub fn is_owned_by(&self, txn_id: TxnId) -> bool {
        self.owner == Some(txn_id)
    }

    pub fn visible_to(&self, snapshot: &Snapshot) -> bool {
        match self.owner {
            Some(owner) => owner == snapshot.txn_id,
            None => self.commit_ts <= snapshot.read_ts,
        }
    }
}

/// Shared, lock-free view of how a transaction ended.
#[derive(Debug)]
pub struct TxnOutcome {
    id: TxnId,
    state: AtomicU8,
}

impl TxnOutcome {
    fn new(id: TxnId) -> Self {
        Self {
            id,
            state: AtomicU8::new(TxnState::Active.as_u8()),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn state(&self) -> TxnState {
        TxnState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: TxnState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

pub struct TransactionManager {
    pub(crate) global_ts: AtomicU64,
    pub(crate) active_slots: [AtomicU64; MAX_CONCURRENT_TXNS],
    pub(crate) slot_lock: Mutex<()>,
}

impl TransactionManager {
    #[allow(clippy::declare_interior_mutable_const)]
    pub fn new() -> Self {
        const INIT: AtomicU64 = AtomicU64::new(0);
        Self {
            global_ts: AtomicU64::new(1),
            #[allow(clippy::borrow_interior_mutable_const)]
            active_slots: [INIT; MAX_CONCURRENT_TXNS],
            slot_lock: Mutex::new(()),
        }
    }

    pub fn begin_txn(&self) -> Result<Transaction> {
        let _guard = self.slot_lock.lock();
        for (idx, slot) in self.active_slots.iter().enumerate() {
            if slot.load(Ordering::Relaxed) == 0 {
                let start_ts = self.global_ts.fetch_add(1, Ordering::SeqCst);
                slot.store(start_ts, Ordering::SeqCst);
                debug!(txn_id = start_ts, slot = idx, "transaction started");
                return Ok(Transaction::new(start_ts, idx));
            }
        }
        Err(DbError::TransactionState(format!(
            "too many concurrent transactions (max {})",
            MAX_CONCURRENT_TXNS
        )))
    }

    /// Snapshot of everything committed so far.
    pub fn committed_snapshot(&self) -> Snapshot {
        let _guard = self.slot_lock.lock();
        Snapshot::committed(self.global_ts.load(Ordering::SeqCst))
    }

    pub fn commit(
        &self,
        txn: &mut Transaction,
        catalog: &Catalog,
        storage: &dyn StorageManager,
    ) -> Result<TxnId> {
        txn.ensure_active("commit")?;

        if !txn.changes.is_empty() {
            if let Err(report) = storage.commit(txn.id, &txn.changes) {
                warn!(txn_id = txn.id, error = %format!("{:#}", report), "storage rejected commit, rolling back");
                self.rollback_changes(txn, catalog);
                txn.commit_failed = true;
                return Err(DbError::CommitFailed {
                    txn_id: txn.id,
                    report: Arc::new(report),
                });
            }
        }

        let commit_ts = {
            let _guard = self.slot_lock.lock();
            let commit_ts = self.global_ts.fetch_add(1, Ordering::SeqCst);
            catalog.commit(txn.id, &txn.changes, commit_ts);
            self.active_slots[txn.slot_idx].store(0, Ordering::SeqCst);
            commit_ts
        };

        txn.finish(TxnState::Committed);
        debug!(
            txn_id = txn.id,
            commit_ts,
            changes = txn.changes.len(),
            "transaction committed"
        );
        catalog.purge_dropped(self.get_global_watermark());
        Ok(commit_ts)
    }

    pub fn rollback(&self, txn: &mut Transaction, catalog: &Catalog) -> Result<()> {
        if txn.state == TxnState::RolledBack && txn.commit_failed {
            return Ok(());
        }
        txn.ensure_active("rollback")?;
        self.rollback_changes(txn, catalog);
        Ok(())
    }

    fn rollback_changes(&self, txn: &mut Transaction, catalog: &Catalog) {
        catalog.invalidate(txn.id, &txn.changes);
        self.abort_txn(txn.slot_idx);
        txn.finish(TxnState::RolledBack);
        debug!(
            txn_id = txn.id,
            changes = txn.changes.len(),
            "transaction rolled back"
        );
        catalog.purge_dropped(self.get_global_watermark());
    }

    /// Runs `f` while no transaction can begin or publish a commit.
    pub fn with_commits_paused<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.slot_lock.lock();
        f()
    }

    pub fn abort_txn(&self, slot_idx: usize) {
        self.active_slots[slot_idx].store(0, Ordering::SeqCst);
    }

    pub fn active_count(&self) -> usize {
        self.active_slots
            .iter()
            .filter(|slot| slot.load(Ordering::Relaxed) != 0)
            .count()
    }

    /// Start timestamp of the oldest active transaction, or the next
    /// timestamp when none is active. No active snapshot reads below it.
    pub fn get_global_watermark(&self) -> TxnId {
        let mut min_ts = self.global_ts.load(Ordering::SeqCst);
        for slot in &self.active_slots {
            let ts = slot.load(Ordering::SeqCst);
            if ts != 0 && ts < min_ts {
                min_ts = ts;
            }
        }
        min_ts
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// One transaction and the ordered catalog changes made under it.
pub struct Transaction {
    id: TxnId,
    read_ts: TxnId,
    slot_idx: usize,
    state: TxnState,
    commit_failed: bool,
    changes: SmallVec<[CatalogChange; 8]>,
    outcome: Arc<TxnOutcome>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("read_ts", &self.read_ts)
            .field("slot_idx", &self.slot_idx)
            .field("state", &self.state)
            .field("changes_count", &self.changes.len())
            .finish()
    }
}

impl Transaction {
    fn new(id: TxnId, slot_idx: usize) -> Self {
        Self {
            id,
            read_ts: id,
            slot_idx,
            state: TxnState::Active,
            commit_failed: false,
            changes: SmallVec::new(),
            outcome: Arc::new(TxnOutcome::new(id)),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn slot_idx(&self) -> usize {
        self.slot_idx
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.id, self.read_ts)
    }

    pub fn changes(&self) -> &[CatalogChange] {
        &self.changes
    }

    pub fn outcome(&self) -> Arc<TxnOutcome> {
        Arc::clone(&self.outcome)
    }

    pub(crate) fn record(&mut self, change: CatalogChange) {
        if let CatalogChange::InsertRows { table, count } = &change {
            if let Some(CatalogChange::InsertRows {
                table: last,
                count: last_count,
            }) = self.changes.last_mut()
            {
                if Arc::ptr_eq(last, table) {
                    *last_count += count;
                    return;
                }
            }
        }
        self.changes.push(change);
    }

    fn ensure_active(&self, op: &str) -> Result<()> {
        if self.state != TxnState::Active {
            return Err(DbError::TransactionState(format!(
                "cannot {} transaction {}: it is already {:?}",
                op, self.id, self.state
            )));
        }
        Ok(())
    }

    fn finish(&mut self, state: TxnState) {
        self.state = state;
        self.outcome.set(state);
    }
}

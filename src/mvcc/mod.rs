//! # Multi-Version Concurrency Control (MVCC)
//!
//! Snapshot visibility for catalog entries and table rows. Readers never
//! block writers: every entry and row carries a [`VersionStamp`] and each
//! transaction reads through a [`Snapshot`] taken when it began.
//!
//! ## Transaction Lifecycle
//!
//! ```text
//! begin_txn() ─────> Active ─────> commit() ─────> Committed
//!                      │                              │
//!                      │                              v
//!                      └──> rollback() ─> RolledBack  └──> versions visible
//! ```
//!
//! ## Visibility Rules
//!
//! A version V is visible to snapshot S if either:
//! 1. V is still owned by S's own transaction (read-your-writes), or
//! 2. V is committed and `V.commit_ts <= S.read_ts`
//!
//! Versions owned by any other uncommitted transaction are invisible. This
//! is what keeps one connection's uncommitted DDL/DML away from another.
//!
//! ## Timestamps
//!
//! Start and commit timestamps come from one atomic counter, so they are
//! totally ordered and never reused. `TxnId = 0` is reserved for bootstrapped
//! state that every snapshot sees.

pub mod transaction;

pub use transaction::{
    Snapshot, Transaction, TransactionManager, TxnId, TxnOutcome, TxnState, VersionStamp,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BOOTSTRAP_TXN_ID, MAX_CONCURRENT_TXNS};
    use std::sync::atomic::Ordering;

    #[test]
    fn txn_state_default_is_active() {
        assert_eq!(TxnState::default(), TxnState::Active);
    }

    #[test]
    fn transaction_manager_new_initializes_global_ts_to_one() {
        let mgr = TransactionManager::new();
        assert_eq!(mgr.global_ts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn begin_txn_increments_timestamp_for_each_transaction() {
        let mgr = TransactionManager::new();
        let txn1 = mgr.begin_txn().unwrap();
        let txn2 = mgr.begin_txn().unwrap();
        assert_eq!(txn1.id(), 1);
        assert_eq!(txn2.id(), 2);
        assert_ne!(txn1.slot_idx(), txn2.slot_idx());
    }

    #[test]
    fn begin_txn_marks_slot_as_active() {
        let mgr = TransactionManager::new();
        let txn = mgr.begin_txn().unwrap();
        let slot_val = mgr.active_slots[txn.slot_idx()].load(Ordering::SeqCst);
        assert_eq!(slot_val, txn.id());
        assert_eq!(mgr.active_count(), 1);
    }

    #[test]
    fn begin_txn_fails_when_all_slots_full() {
        let mgr = TransactionManager::new();
        let mut txns = Vec::new();
        for _ in 0..MAX_CONCURRENT_TXNS {
            txns.push(mgr.begin_txn().unwrap());
        }
        assert!(mgr.begin_txn().is_err());
    }

    #[test]
    fn watermark_tracks_oldest_active_transaction() {
        let mgr = TransactionManager::new();
        let t1 = mgr.begin_txn().unwrap();
        let _t2 = mgr.begin_txn().unwrap();
        assert_eq!(mgr.get_global_watermark(), t1.id());
        mgr.abort_txn(t1.slot_idx());
        assert_eq!(mgr.get_global_watermark(), 2);
    }

    #[test]
    fn own_uncommitted_version_is_visible_only_to_owner() {
        let stamp = VersionStamp::uncommitted(5);
        assert!(stamp.visible_to(&Snapshot::new(5, 5)));
        assert!(!stamp.visible_to(&Snapshot::new(6, 6)));
        assert!(!stamp.visible_to(&Snapshot::new(BOOTSTRAP_TXN_ID, 100)));
    }

    #[test]
    fn committed_version_is_visible_after_its_commit_timestamp() {
        let stamp = VersionStamp::committed(7);
        assert!(!stamp.visible_to(&Snapshot::new(6, 6)));
        assert!(stamp.visible_to(&Snapshot::new(8, 8)));
        assert!(VersionStamp::bootstrap().visible_to(&Snapshot::new(1, 1)));
    }
}

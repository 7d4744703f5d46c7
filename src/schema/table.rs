//! # Table Definitions and Row Storage
//!
//! A table entry owns its column list and its rows. Rows are kept in memory
//! and carry the same [`VersionStamp`] as catalog entries, so a scan through
//! a snapshot sees exactly the rows its transaction should see. Durable
//! storage only ever receives committed rows, through a checkpoint.
//!
//! ```text
//! TableDef
//! ├── columns: [ColumnDef { name, data_type }]
//! └── rows: RwLock<Vec<StoredRow>>
//!        ├── StoredRow { values, stamp: committed(ts) }     visible if ts <= read_ts
//!        └── StoredRow { values, stamp: uncommitted(txn) }  visible to txn only
//! ```

use crate::mvcc::{Snapshot, TxnId, VersionStamp};
use crate::types::{DataType, OwnedValue};
use parking_lot::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub values: Vec<OwnedValue>,
    stamp: VersionStamp,
}

#[derive(Debug)]
pub struct TableDef {
    columns: Vec<ColumnDef>,
    rows: RwLock<Vec<StoredRow>>,
}

impl TableDef {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self {
            columns,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn with_committed_rows(columns: Vec<ColumnDef>, rows: Vec<Vec<OwnedValue>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|values| StoredRow {
                values,
                stamp: VersionStamp::bootstrap(),
            })
            .collect();
        Self {
            columns,
            rows: RwLock::new(rows),
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Rows visible to `snapshot`, in insertion order.
    pub fn scan(&self, snapshot: &Snapshot) -> Vec<Vec<OwnedValue>> {
        self.rows
            .read()
            .iter()
            .filter(|row| row.stamp.visible_to(snapshot))
            .map(|row| row.values.clone())
            .collect()
    }

    pub fn committed_rows(&self) -> Vec<Vec<OwnedValue>> {
        self.rows
            .read()
            .iter()
            .filter(|row| row.stamp.is_committed())
            .map(|row| row.values.clone())
            .collect()
    }

    pub(crate) fn append(&self, txn_id: TxnId, rows: Vec<Vec<OwnedValue>>) {
        let mut guard = self.rows.write();
        guard.extend(rows.into_iter().map(|values| StoredRow {
            values,
            stamp: VersionStamp::uncommitted(txn_id),
        }));
    }

    pub(crate) fn commit_rows(&self, txn_id: TxnId, commit_ts: TxnId) {
        let mut guard = self.rows.write();
        for row in guard.iter_mut().filter(|r| r.stamp.is_owned_by(txn_id)) {
            row.stamp = VersionStamp::committed(commit_ts);
        }
    }

    pub(crate) fn discard_rows(&self, txn_id: TxnId) {
        self.rows.write().retain(|r| !r.stamp.is_owned_by(txn_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableDef {
        TableDef::new(vec![ColumnDef::new("i", DataType::Int1)])
    }

    #[test]
    fn uncommitted_rows_are_private_to_their_transaction() {
        let t = table();
        t.append(3, vec![vec![OwnedValue::Int(11)]]);
        assert_eq!(t.scan(&Snapshot::new(3, 3)).len(), 1);
        assert_eq!(t.scan(&Snapshot::new(4, 4)).len(), 0);
        assert!(t.committed_rows().is_empty());
    }

    #[test]
    fn committed_rows_respect_read_timestamp() {
        let t = table();
        t.append(3, vec![vec![OwnedValue::Int(11)]]);
        t.commit_rows(3, 5);
        assert_eq!(t.scan(&Snapshot::new(4, 4)).len(), 0);
        assert_eq!(t.scan(&Snapshot::new(6, 6)).len(), 1);
    }

    #[test]
    fn discard_removes_only_the_rolled_back_transaction() {
        let t = table();
        t.append(3, vec![vec![OwnedValue::Int(1)]]);
        t.commit_rows(3, 4);
        t.append(5, vec![vec![OwnedValue::Int(2)], vec![OwnedValue::Int(3)]]);
        t.discard_rows(5);
        assert_eq!(t.committed_rows(), vec![vec![OwnedValue::Int(1)]]);
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        assert_eq!(table().column_index("I"), Some(0));
        assert_eq!(table().column_index("j"), None);
    }
}

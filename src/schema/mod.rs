//! # Versioned Catalog
//!
//! The catalog is the namespace of schema objects: tables, scalar functions
//! and collations. Every entry is versioned under MVCC so that one
//! connection's uncommitted DDL never leaks into another's transaction.
//!
//! ## Entry Lifecycle
//!
//! ```text
//!            create_entry(txn)
//!                  │
//!                  ▼
//!   ┌──────────────────────────────┐  txn rolls back   ┌─────────────┐
//!   │ created = uncommitted(txn)   │ ────────────────> │ invalidated │
//!   └──────────────────────────────┘                   └─────────────┘
//!                  │ txn commits                              ▲
//!                  ▼                                          │
//!   ┌──────────────────────────────┐  drop committed  ┌──────────────────┐
//!   │ created = committed(ts)      │ ───────────────> │ dropped = ts'    │
//!   └──────────────────────────────┘                  └──────────────────┘
//!                                          watermark passes ts' │
//!                                                               └─> invalidated
//! ```
//!
//! A committed drop hides the entry from snapshots taken after it, while
//! transactions that began earlier keep reading it. Once no active
//! transaction is older than the drop, the catalog purges the entry and
//! invalidates it. An invalidated entry is removed from name resolution and
//! never comes back. Anything holding an [`EntryRef`] (a bound plan, for
//! instance) checks [`CatalogEntry::is_invalidated`] and
//! [`CatalogEntry::is_dropped_for`] before using it. Entries never point
//! back at their dependents.
//!
//! ## Namespaces
//!
//! Each [`EntryKind`] is its own namespace: a table and a function may share
//! a name. Names are case-insensitive.
//!
//! ## Change Log
//!
//! Every mutation made under a transaction is appended to that
//! transaction's ordered list of [`CatalogChange`]s. Commit walks the list
//! forward to stamp versions; rollback walks it backward to undo them.

mod catalog;
pub mod persistence;
mod table;

pub use catalog::Catalog;
pub use table::{ColumnDef, StoredRow, TableDef};

use crate::mvcc::{Snapshot, TxnId, VersionStamp};
use crate::sql::functions::{Collation, ScalarFunction};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type EntryRef = Arc<CatalogEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Table,
    Function,
    Collation,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Table => f.write_str("table"),
            EntryKind::Function => f.write_str("function"),
            EntryKind::Collation => f.write_str("collation"),
        }
    }
}

pub enum EntryDefinition {
    Table(TableDef),
    Function(ScalarFunction),
    Collation(Collation),
}

impl EntryDefinition {
    pub fn table(columns: Vec<ColumnDef>) -> Self {
        EntryDefinition::Table(TableDef::new(columns))
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            EntryDefinition::Table(_) => EntryKind::Table,
            EntryDefinition::Function(_) => EntryKind::Function,
            EntryDefinition::Collation(_) => EntryKind::Collation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EntryState {
    created: VersionStamp,
    dropped: Option<VersionStamp>,
}

pub struct CatalogEntry {
    oid: u64,
    name: String,
    definition: EntryDefinition,
    state: RwLock<EntryState>,
    invalidated: AtomicBool,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("oid", &self.oid)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("state", &*self.state.read())
            .field("invalidated", &self.is_invalidated())
            .finish()
    }
}

impl CatalogEntry {
    fn new(oid: u64, name: String, definition: EntryDefinition, created: VersionStamp) -> Self {
        Self {
            oid,
            name,
            definition,
            state: RwLock::new(EntryState {
                created,
                dropped: None,
            }),
            invalidated: AtomicBool::new(false),
        }
    }

    pub fn oid(&self) -> u64 {
        self.oid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.definition.kind()
    }

    pub fn definition(&self) -> &EntryDefinition {
        &self.definition
    }

    pub fn as_table(&self) -> Option<&TableDef> {
        match &self.definition {
            EntryDefinition::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ScalarFunction> {
        match &self.definition {
            EntryDefinition::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_collation(&self) -> Option<&Collation> {
        match &self.definition {
            EntryDefinition::Collation(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Acquire)
    }

    /// Owning transaction, `None` once committed.
    pub fn owning_transaction(&self) -> Option<TxnId> {
        self.state.read().created.owner()
    }

    pub fn visible_to(&self, snapshot: &Snapshot) -> bool {
        if self.is_invalidated() {
            return false;
        }
        let state = self.state.read();
        if !state.created.visible_to(snapshot) {
            return false;
        }
        !matches!(state.dropped, Some(d) if d.visible_to(snapshot))
    }

    /// Whether a committed drop hides this entry from `snapshot`. Without a
    /// snapshot the check is against the latest committed state.
    pub fn is_dropped_for(&self, snapshot: Option<&Snapshot>) -> bool {
        match self.state.read().dropped {
            Some(d) if d.is_committed() => snapshot.map_or(true, |s| d.visible_to(s)),
            _ => false,
        }
    }

    fn drop_committed_at(&self) -> Option<TxnId> {
        self.state
            .read()
            .dropped
            .filter(VersionStamp::is_committed)
            .map(|d| d.commit_ts())
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
    }
}

/// One mutation recorded in a transaction's change log.
#[derive(Debug, Clone)]
pub enum CatalogChange {
    Created(EntryRef),
    Dropped(EntryRef),
    InsertRows { table: EntryRef, count: usize },
}


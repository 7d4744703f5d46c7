//! # Catalog Name Resolution
//!
//! The [`Catalog`] maps `(kind, lowercase name)` to the versions of every
//! entry that ever carried that name and has not been invalidated. A name
//! usually has one version. It has two while a transaction replaces it: the
//! committed one carrying that transaction's drop mark, and the new one
//! still owned by the transaction.
//!
//! ```text
//! (Table, "a") ──> [ oid 4 created=committed(7) dropped=uncommitted(9) ]
//!                  [ oid 6 created=uncommitted(9)                      ]
//! ```
//!
//! Readers take the map's read lock and pick the newest version visible to
//! their snapshot. Writers take the write lock for the duration of one
//! mutation, which also serializes their conflict checks.
//!
//! ## Conflicts
//!
//! A transaction may not create a name another active transaction has
//! created or dropped, and may not drop or write to an entry another active
//! transaction is dropping. Such operations fail with a catalog error
//! instead of waiting.

use super::{CatalogChange, EntryDefinition, EntryKind, EntryRef};
use super::{CatalogEntry, ColumnDef, TableDef};
use crate::error::{DbError, Result};
use crate::mvcc::{Snapshot, Transaction, TxnId, VersionStamp};
use crate::types::OwnedValue;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type Versions = SmallVec<[EntryRef; 2]>;

pub struct Catalog {
    entries: RwLock<HashMap<(EntryKind, String), Versions>>,
    retired: Mutex<Vec<EntryRef>>,
    next_oid: AtomicU64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn key(kind: EntryKind, name: &str) -> (EntryKind, String) {
    (kind, name.to_ascii_lowercase())
}

fn dropped_concurrently(kind: EntryKind, name: &str) -> DbError {
    DbError::Catalog(format!(
        "{} '{}' was dropped by a transaction that committed after this one started",
        kind, name
    ))
}

fn conflict(kind: EntryKind, name: &str, other: TxnId) -> DbError {
    DbError::Catalog(format!(
        "write conflict on {} '{}': transaction {} has an uncommitted change to it",
        kind, name, other
    ))
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
            next_oid: AtomicU64::new(1),
        }
    }

    fn allocate_oid(&self) -> u64 {
        self.next_oid.fetch_add(1, Ordering::Relaxed)
    }

    /// Creates an entry owned by `txn`. It stays invisible to every other
    /// transaction until `txn` commits.
    pub fn create_entry(
        &self,
        txn: &mut Transaction,
        name: &str,
        kind: EntryKind,
        definition: EntryDefinition,
    ) -> Result<EntryRef> {
        if definition.kind() != kind {
            return Err(DbError::Catalog(format!(
                "cannot create {} '{}' from a {} definition",
                kind,
                name,
                definition.kind()
            )));
        }

        let snapshot = txn.snapshot();
        let mut entries = self.entries.write();
        let versions = entries.entry(key(kind, name)).or_default();

        for existing in versions.iter() {
            if existing.is_invalidated() {
                continue;
            }
            if existing.visible_to(&snapshot) {
                return Err(DbError::Catalog(format!(
                    "{} '{}' already exists",
                    kind, existing.name
                )));
            }
            let state = existing.state.read();
            if let Some(owner) = state.created.owner() {
                if owner != snapshot.txn_id {
                    return Err(conflict(kind, name, owner));
                }
            } else if state.dropped.is_none() {
                return Err(DbError::Catalog(format!(
                    "{} '{}' was created by a transaction that committed after this one started",
                    kind, name
                )));
            }
            if let Some(owner) = state.dropped.and_then(|d| d.owner()) {
                if owner != snapshot.txn_id {
                    return Err(conflict(kind, name, owner));
                }
            }
        }

        let entry = Arc::new(CatalogEntry::new(
            self.allocate_oid(),
            name.to_string(),
            definition,
            VersionStamp::uncommitted(snapshot.txn_id),
        ));
        versions.push(Arc::clone(&entry));
        drop(entries);

        txn.record(CatalogChange::Created(Arc::clone(&entry)));
        debug!(txn_id = snapshot.txn_id, oid = entry.oid, %kind, name, "catalog entry created");
        Ok(entry)
    }

    /// Registers an entry as committed base state, outside any transaction.
    /// Used for extension objects and for tables loaded from a checkpoint.
    pub fn create_base_entry(&self, name: &str, definition: EntryDefinition) -> Result<EntryRef> {
        let kind = definition.kind();
        let mut entries = self.entries.write();
        let versions = entries.entry(key(kind, name)).or_default();
        if let Some(existing) = versions
            .iter()
            .find(|e| !e.is_invalidated() && !e.is_dropped_for(None))
        {
            return Err(DbError::Catalog(format!(
                "{} '{}' already exists",
                kind, existing.name
            )));
        }
        let entry = Arc::new(CatalogEntry::new(
            self.allocate_oid(),
            name.to_string(),
            definition,
            VersionStamp::bootstrap(),
        ));
        versions.push(Arc::clone(&entry));
        Ok(entry)
    }

    pub(crate) fn load_table(
        &self,
        name: &str,
        columns: Vec<ColumnDef>,
        rows: Vec<Vec<OwnedValue>>,
    ) -> Result<EntryRef> {
        let definition = EntryDefinition::Table(TableDef::with_committed_rows(columns, rows));
        self.create_base_entry(name, definition)
    }

    pub fn resolve(&self, kind: EntryKind, name: &str, snapshot: &Snapshot) -> Result<EntryRef> {
        self.lookup(kind, name, snapshot).ok_or_else(|| {
            DbError::Catalog(format!("{} '{}' does not exist", kind, name))
        })
    }

    pub fn lookup(&self, kind: EntryKind, name: &str, snapshot: &Snapshot) -> Option<EntryRef> {
        let entries = self.entries.read();
        entries
            .get(&key(kind, name))?
            .iter()
            .rev()
            .find(|e| e.visible_to(snapshot))
            .cloned()
    }

    /// Marks the visible entry as dropped by `txn`. It disappears for `txn`
    /// at once and for everyone else when `txn` commits.
    pub fn drop_entry(&self, txn: &mut Transaction, kind: EntryKind, name: &str) -> Result<EntryRef> {
        let snapshot = txn.snapshot();
        let entries = self.entries.write();
        let entry = entries
            .get(&key(kind, name))
            .and_then(|versions| versions.iter().rev().find(|e| e.visible_to(&snapshot)))
            .cloned()
            .ok_or_else(|| DbError::Catalog(format!("{} '{}' does not exist", kind, name)))?;

        {
            let mut state = entry.state.write();
            match state.dropped.map(|d| d.owner()) {
                Some(Some(owner)) => return Err(conflict(kind, name, owner)),
                Some(None) => return Err(dropped_concurrently(kind, name)),
                None => {}
            }
            state.dropped = Some(VersionStamp::uncommitted(snapshot.txn_id));
        }
        drop(entries);

        txn.record(CatalogChange::Dropped(Arc::clone(&entry)));
        debug!(txn_id = snapshot.txn_id, oid = entry.oid, %kind, name, "catalog entry dropped");
        Ok(entry)
    }

    pub fn insert_rows(
        &self,
        txn: &mut Transaction,
        entry: &EntryRef,
        rows: Vec<Vec<OwnedValue>>,
    ) -> Result<()> {
        let snapshot = txn.snapshot();
        let table = entry.as_table().ok_or_else(|| {
            DbError::Catalog(format!("{} '{}' is not a table", entry.kind(), entry.name))
        })?;
        if !entry.visible_to(&snapshot) {
            return Err(DbError::Catalog(format!(
                "table '{}' does not exist",
                entry.name
            )));
        }
        match entry.state.read().dropped.map(|d| d.owner()) {
            Some(Some(owner)) => return Err(conflict(EntryKind::Table, &entry.name, owner)),
            Some(None) => return Err(dropped_concurrently(EntryKind::Table, &entry.name)),
            None => {}
        }
        if rows.is_empty() {
            return Ok(());
        }

        let count = rows.len();
        table.append(snapshot.txn_id, rows);
        txn.record(CatalogChange::InsertRows {
            table: Arc::clone(entry),
            count,
        });
        Ok(())
    }

    /// Makes every change of `txn_id` permanent at `commit_ts`.
    pub fn commit(&self, txn_id: TxnId, changes: &[CatalogChange], commit_ts: TxnId) {
        for change in changes {
            match change {
                CatalogChange::Created(entry) => {
                    let mut state = entry.state.write();
                    if state.created.is_owned_by(txn_id) {
                        state.created = VersionStamp::committed(commit_ts);
                    }
                }
                CatalogChange::Dropped(entry) => {
                    let mut state = entry.state.write();
                    if matches!(state.dropped, Some(d) if d.is_owned_by(txn_id)) {
                        state.dropped = Some(VersionStamp::committed(commit_ts));
                        self.retired.lock().push(Arc::clone(entry));
                    }
                }
                CatalogChange::InsertRows { table, .. } => {
                    if let Some(def) = table.as_table() {
                        def.commit_rows(txn_id, commit_ts);
                    }
                }
            }
        }
    }

    /// Undoes every change of `txn_id`, newest first. Entries the
    /// transaction created are invalidated for good.
    pub fn invalidate(&self, txn_id: TxnId, changes: &[CatalogChange]) {
        for change in changes.iter().rev() {
            match change {
                CatalogChange::Created(entry) => {
                    entry.invalidate();
                    self.unlink(entry);
                    debug!(txn_id, oid = entry.oid, name = %entry.name, "catalog entry invalidated");
                }
                CatalogChange::Dropped(entry) => {
                    let mut state = entry.state.write();
                    if matches!(state.dropped, Some(d) if d.is_owned_by(txn_id)) {
                        state.dropped = None;
                    }
                }
                CatalogChange::InsertRows { table, .. } => {
                    if let Some(def) = table.as_table() {
                        def.discard_rows(txn_id);
                    }
                }
            }
        }
    }

    /// Unlinks and invalidates dropped entries no active snapshot can see
    /// anymore, i.e. whose drop committed at or below `watermark`.
    pub fn purge_dropped(&self, watermark: TxnId) -> usize {
        let purged: Vec<EntryRef> = {
            let mut retired = self.retired.lock();
            let (purge, keep): (Vec<EntryRef>, Vec<EntryRef>) = retired
                .drain(..)
                .partition(|e| e.drop_committed_at().is_some_and(|ts| ts <= watermark));
            *retired = keep;
            purge
        };
        for entry in &purged {
            entry.invalidate();
            self.unlink(entry);
            debug!(oid = entry.oid, name = %entry.name, watermark, "dropped catalog entry purged");
        }
        purged.len()
    }

    fn unlink(&self, entry: &EntryRef) {
        let mut entries = self.entries.write();
        let k = key(entry.kind(), &entry.name);
        if let Some(versions) = entries.get_mut(&k) {
            versions.retain(|e| !Arc::ptr_eq(e, entry));
            if versions.is_empty() {
                entries.remove(&k);
            }
        }
    }

    /// Tables whose creation is committed, in creation order.
    pub fn committed_tables(&self) -> Vec<EntryRef> {
        let entries = self.entries.read();
        let mut tables: Vec<EntryRef> = entries
            .iter()
            .filter(|((kind, _), _)| *kind == EntryKind::Table)
            .flat_map(|(_, versions)| versions.iter())
            .filter(|e| {
                !e.is_invalidated()
                    && !e.is_dropped_for(None)
                    && e.state.read().created.is_committed()
            })
            .cloned()
            .collect();
        tables.sort_by_key(|e| e.oid);
        tables
    }

    pub fn entry_count(&self, kind: EntryKind) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, versions)| versions.len())
            .sum()
    }
}

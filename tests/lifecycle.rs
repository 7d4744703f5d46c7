//! # Attachment Lifecycle Tests
//!
//! Attach, shutdown-time checkpointing and detach. A counting storage double
//! observes checkpoint attempts; file-backed cases reattach the same path to
//! see what was persisted.

use keeldb::storage::CheckpointImage;
use keeldb::{
    Database, DbError, InvalidationCause, OwnedValue, ShutdownOutcome, SkipReason,
    StorageManager,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct CountingStorage {
    in_memory: bool,
    fail: bool,
    checkpoints: Arc<AtomicUsize>,
}

impl CountingStorage {
    fn new(in_memory: bool) -> Self {
        Self {
            in_memory,
            fail: false,
            checkpoints: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(false)
        }
    }

    fn count(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }
}

impl StorageManager for CountingStorage {
    fn initialize(&self) -> eyre::Result<CheckpointImage> {
        Ok(CheckpointImage::default())
    }

    fn in_memory(&self) -> bool {
        self.in_memory
    }

    fn create_checkpoint(&self, _image: &CheckpointImage, _force: bool) -> eyre::Result<()> {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            eyre::bail!("checkpoint device unavailable");
        }
        Ok(())
    }
}

fn open_with(storage: &CountingStorage, checkpoint_on_shutdown: bool) -> Database {
    Database::builder()
        .storage(Box::new(storage.clone()))
        .checkpoint_on_shutdown(checkpoint_on_shutdown)
        .open()
        .unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn in_memory_shutdown_never_checkpoints() {
    let storage = CountingStorage::new(true);
    let db = open_with(&storage, true);
    assert_eq!(db.detach(), ShutdownOutcome::Skipped(SkipReason::InMemory));
    assert_eq!(storage.count(), 0);
}

#[test]
fn file_backed_shutdown_checkpoints_exactly_once() {
    let storage = CountingStorage::new(false);
    let db = open_with(&storage, true);
    let clone = db.clone();
    let conn = db.connect().unwrap();
    conn.query("CREATE TABLE t (v INTEGER)", &[]).unwrap();

    drop(db);
    assert_eq!(storage.count(), 0, "a live clone keeps the attachment");
    drop(clone);
    assert_eq!(storage.count(), 1);
    drop(conn);
    assert_eq!(storage.count(), 1);
}

#[test]
fn disabled_checkpoint_on_shutdown_skips() {
    let storage = CountingStorage::new(false);
    let db = open_with(&storage, false);
    assert_eq!(db.shutdown(), ShutdownOutcome::Skipped(SkipReason::Disabled));
    assert_eq!(
        db.shutdown(),
        ShutdownOutcome::Skipped(SkipReason::AlreadyShutDown)
    );
    drop(db);
    assert_eq!(storage.count(), 0);
}

#[test]
fn checkpoint_failure_is_swallowed() {
    let storage = CountingStorage::failing();
    let db = open_with(&storage, true);
    assert_eq!(db.detach(), ShutdownOutcome::CheckpointFailed);
    assert_eq!(storage.count(), 1);
}

#[test]
fn unwinding_teardown_skips_checkpoint() {
    let storage = CountingStorage::new(false);
    let inner = storage.clone();
    let result = catch_unwind(AssertUnwindSafe(move || {
        let db = open_with(&inner, true);
        let _conn = db.connect().unwrap();
        panic!("statement failed mid-flight");
    }));
    assert!(result.is_err());
    assert_eq!(storage.count(), 0);
}

#[test]
fn explicit_checkpoint_reaches_storage() {
    let storage = CountingStorage::new(false);
    let db = open_with(&storage, false);
    let conn = db.connect().unwrap();
    conn.checkpoint(false).unwrap();
    conn.query("FORCE CHECKPOINT", &[]).unwrap();
    assert_eq!(storage.count(), 2);
}

#[test]
fn non_forced_checkpoint_waits_for_other_transactions() {
    let storage = CountingStorage::new(false);
    let db = open_with(&storage, false);
    let busy = db.connect().unwrap();
    let conn = db.connect().unwrap();
    busy.begin().unwrap();

    assert!(matches!(conn.checkpoint(false), Err(DbError::TransactionState(_))));
    conn.checkpoint(true).unwrap();
    busy.rollback().unwrap();
    conn.checkpoint(false).unwrap();
    assert_eq!(storage.count(), 2);
}

#[test]
fn detached_database_fails_new_work() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connect().unwrap();
    conn.query("CREATE TABLE t (v INTEGER)", &[]).unwrap();
    let stmt = conn.prepare("SELECT COUNT(*) FROM t");
    let name = db.name().to_string();

    db.detach();

    assert!(matches!(conn.begin(), Err(DbError::DatabaseDetached(n)) if n == name));
    let failed = conn.prepare("SELECT 1");
    assert!(!failed.success());
    assert!(matches!(failed.error(), Some(DbError::DatabaseDetached(_))));
    assert!(matches!(
        stmt.execute(&[]),
        Err(DbError::InvalidatedStatement(InvalidationCause::DatabaseDetached))
    ));
}

#[test]
fn attachment_name_comes_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(path_str(&dir.path().join("sales.db"))).unwrap();
    assert_eq!(db.name(), "sales");
    assert!(!db.is_in_memory());

    let mem = Database::builder().path("").open().unwrap();
    assert_eq!(mem.name(), "memory");
    assert!(mem.is_in_memory());
}

#[test]
fn reattach_sees_checkpointed_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keep.db");
    {
        let db = Database::open(path_str(&path)).unwrap();
        let conn = db.connect().unwrap();
        conn.execute_batch("CREATE TABLE a (i INTEGER, s VARCHAR); INSERT INTO a VALUES (1, 'x'), (2, NULL)")
            .unwrap();
        assert_eq!(db.detach(), ShutdownOutcome::Checkpointed);
    }

    let db = Database::open(path_str(&path)).unwrap();
    let conn = db.connect().unwrap();
    let result = conn.query("SELECT i, s FROM a ORDER BY i", &[]).unwrap();
    let rows = result.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].values, vec![OwnedValue::Int(1), OwnedValue::from("x")]);
    assert!(rows[1].is_null(1));
}

#[test]
fn reattach_without_shutdown_checkpoint_loses_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lost.db");
    {
        let db = Database::builder()
            .path(&path)
            .checkpoint_on_shutdown(false)
            .open()
            .unwrap();
        let conn = db.connect().unwrap();
        conn.query("CREATE TABLE a (i INTEGER)", &[]).unwrap();
        assert_eq!(db.detach(), ShutdownOutcome::Skipped(SkipReason::Disabled));
    }

    let db = Database::builder()
        .path(&path)
        .checkpoint_on_shutdown(false)
        .open()
        .unwrap();
    let conn = db.connect().unwrap();
    let err = conn.query("SELECT * FROM a", &[]).unwrap_err();
    assert!(matches!(err, DbError::Catalog(_)));
}

#[test]
fn explicit_checkpoint_persists_without_shutdown_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.db");
    {
        let db = Database::builder()
            .path(&path)
            .checkpoint_on_shutdown(false)
            .open()
            .unwrap();
        let conn = db.connect().unwrap();
        conn.execute_batch("CREATE TABLE a (i INTEGER); INSERT INTO a VALUES (3); CHECKPOINT")
            .unwrap();
        conn.query("INSERT INTO a VALUES (4)", &[]).unwrap();
    }

    let db = Database::open(path_str(&path)).unwrap();
    let conn = db.connect().unwrap();
    let result = conn.query("SELECT SUM(i) FROM a", &[]).unwrap();
    assert_eq!(result.scalar(), Some(&OwnedValue::Int(3)));
}

#[test]
fn corrupt_file_fails_the_attach() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.db");
    std::fs::write(&path, b"definitely not a checkpoint").unwrap();
    let err = Database::open(path_str(&path)).unwrap_err();
    assert!(matches!(err, DbError::Attach { .. }), "{:?}", err);
}

#[test]
fn read_only_attach_requires_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");
    let err = Database::builder()
        .path(&path)
        .read_only()
        .open()
        .unwrap_err();
    assert!(matches!(err, DbError::Attach { .. }));
    assert!(!path.exists());
}

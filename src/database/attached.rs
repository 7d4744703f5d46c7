//! # Attached Database
//!
//! `AttachedDatabase` is the root owner of one attachment: its storage
//! manager, catalog and transaction manager. Connections hold it through an
//! `Arc`; the database-level [`Database`](super::Database) handle decides
//! when it is shut down.
//!
//! ## Attach
//!
//! ```text
//! attach(path, config)
//!   1. name     = file base name, or "memory" for "" / ":memory:"
//!   2. storage  = injected, InMemoryStorage, or SingleFileStorage(path)
//!   3. image    = storage.initialize()        ── error: AttachError
//!   4. catalog  <- image tables               ── error: AttachError
//!   5. catalog  <- CoreExtension, then user extensions
//!   6. publish Arc<AttachedDatabase>
//! ```
//!
//! Nothing is published until every step succeeded, so a failed attach
//! leaves no partial attachment behind.
//!
//! ## Shutdown
//!
//! Shutdown runs once. It marks the attachment detached and then
//! checkpoints unless one of the skip reasons applies:
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | shutdown already ran | `Skipped(AlreadyShutDown)` |
//! | storage is in-memory | `Skipped(InMemory)` |
//! | `checkpoint_on_shutdown == false` | `Skipped(Disabled)` |
//! | thread is unwinding from a panic | `Skipped(Unwinding)` |
//! | checkpoint error | `CheckpointFailed`, logged and swallowed |
//! | otherwise | `Checkpointed` |

use crate::config::{DbConfig, IN_MEMORY_PATH, MEMORY_DATABASE_NAME};
use crate::error::{DbError, Result};
use crate::mvcc::TransactionManager;
use crate::schema::{Catalog, EntryDefinition};
use crate::sql::functions::{CoreExtension, Extension, FunctionRegistrar};
use crate::storage::{CheckpointImage, InMemoryStorage, SingleFileStorage, StorageManager};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InMemory,
    Disabled,
    Unwinding,
    AlreadyShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Checkpointed,
    CheckpointFailed,
    Skipped(SkipReason),
}

/// Derives the attachment name from its path: the file name up to its
/// first `.`, so `sales.2024.db` attaches as `sales`.
pub fn extract_database_name(path: &str) -> String {
    if path.is_empty() || path == IN_MEMORY_PATH {
        return MEMORY_DATABASE_NAME.to_string();
    }
    let base = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    base.split('.')
        .find(|part| !part.is_empty())
        .unwrap_or(base)
        .to_string()
}

pub(crate) fn is_in_memory_path(path: &str) -> bool {
    path.is_empty() || path == IN_MEMORY_PATH
}

pub struct AttachedDatabase {
    name: String,
    path: String,
    config: DbConfig,
    storage: Box<dyn StorageManager>,
    catalog: Catalog,
    txn_manager: TransactionManager,
    detached: AtomicBool,
    shut_down: AtomicBool,
    checkpoint_lock: Mutex<()>,
}

impl std::fmt::Debug for AttachedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachedDatabase")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("config", &self.config)
            .field("detached", &self.detached.load(Ordering::Relaxed))
            .finish()
    }
}

impl AttachedDatabase {
    pub fn attach(
        path: &str,
        config: DbConfig,
        storage: Option<Box<dyn StorageManager>>,
        extensions: &[Arc<dyn Extension>],
    ) -> Result<Arc<Self>> {
        let name = extract_database_name(path);
        let storage = storage.unwrap_or_else(|| -> Box<dyn StorageManager> {
            if is_in_memory_path(path) {
                Box::new(InMemoryStorage::new())
            } else {
                Box::new(SingleFileStorage::new(path, config.read_only()))
            }
        });

        let db = Self {
            name,
            path: path.to_string(),
            config,
            storage,
            catalog: Catalog::new(),
            txn_manager: TransactionManager::new(),
            detached: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            checkpoint_lock: Mutex::new(()),
        };
        db.initialize(extensions)?;

        info!(
            name = %db.name,
            path = %db.path,
            in_memory = db.storage.in_memory(),
            access_mode = ?db.config.access_mode,
            "database attached"
        );
        Ok(Arc::new(db))
    }

    fn attach_error(&self, reason: String) -> DbError {
        DbError::Attach {
            path: self.path.clone(),
            reason,
        }
    }

    fn initialize(&self, extensions: &[Arc<dyn Extension>]) -> Result<()> {
        let image = self
            .storage
            .initialize()
            .map_err(|e| self.attach_error(format!("{:#}", e)))?;
        let tables = image.tables.len();
        image
            .load_into(&self.catalog)
            .map_err(|e| self.attach_error(format!("{:#}", e)))?;
        debug!(name = %self.name, tables, "checkpoint image loaded");

        self.register_extension(&CoreExtension)?;
        for extension in extensions {
            self.register_extension(extension.as_ref())?;
        }
        Ok(())
    }

    fn register_extension(&self, extension: &dyn Extension) -> Result<()> {
        let mut registrar = FunctionRegistrar::new();
        extension.load(&mut registrar);
        let (functions, collations) = registrar.into_parts();
        let (n_functions, n_collations) = (functions.len(), collations.len());

        for function in functions {
            let name = function.name.clone();
            self.catalog
                .create_base_entry(&name, EntryDefinition::Function(function))
                .map_err(|e| {
                    self.attach_error(format!("extension '{}': {}", extension.name(), e))
                })?;
        }
        for collation in collations {
            let name = collation.name.clone();
            self.catalog
                .create_base_entry(&name, EntryDefinition::Collation(collation))
                .map_err(|e| {
                    self.attach_error(format!("extension '{}': {}", extension.name(), e))
                })?;
        }
        debug!(
            extension = extension.name(),
            functions = n_functions,
            collations = n_collations,
            "extension loaded"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.txn_manager
    }

    pub fn storage(&self) -> &dyn StorageManager {
        self.storage.as_ref()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub fn ensure_attached(&self) -> Result<()> {
        if self.is_detached() {
            return Err(DbError::DatabaseDetached(self.name.clone()));
        }
        Ok(())
    }

    /// Writes the committed state through the storage manager.
    ///
    /// Without `force` the checkpoint is refused while any transaction is
    /// active. With `force` it proceeds and captures committed state only.
    pub fn checkpoint(&self, force: bool) -> Result<()> {
        let _guard = self.checkpoint_lock.lock();
        let image = self.txn_manager.with_commits_paused(|| {
            let active = self.txn_manager.active_count();
            if active > 0 && !force {
                return Err(DbError::TransactionState(format!(
                    "cannot CHECKPOINT: {} transaction(s) still active, use FORCE CHECKPOINT",
                    active
                )));
            }
            Ok(CheckpointImage::capture(&self.catalog))
        })?;

        self.storage
            .create_checkpoint(&image, force)
            .map_err(DbError::storage)?;
        debug!(name = %self.name, tables = image.tables.len(), force, "checkpoint written");
        Ok(())
    }

    /// Runs the shutdown protocol. Never fails; later calls are no-ops.
    pub fn shutdown(&self, unwinding: bool) -> ShutdownOutcome {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return ShutdownOutcome::Skipped(SkipReason::AlreadyShutDown);
        }
        self.detached.store(true, Ordering::Release);

        let outcome = if self.storage.in_memory() {
            ShutdownOutcome::Skipped(SkipReason::InMemory)
        } else if !self.config.checkpoint_on_shutdown {
            ShutdownOutcome::Skipped(SkipReason::Disabled)
        } else if unwinding {
            ShutdownOutcome::Skipped(SkipReason::Unwinding)
        } else {
            match self.checkpoint(true) {
                Ok(()) => ShutdownOutcome::Checkpointed,
                Err(e) => {
                    warn!(name = %self.name, error = %e, "checkpoint on shutdown failed");
                    ShutdownOutcome::CheckpointFailed
                }
            }
        };

        info!(name = %self.name, outcome = ?outcome, "database detached");
        outcome
    }
}

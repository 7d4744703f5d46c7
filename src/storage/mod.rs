//! # Storage Module
//!
//! The storage layer sits underneath an attachment and decides what survives
//! a restart. The rest of the crate only talks to it through the
//! [`StorageManager`] trait:
//!
//! ```text
//! AttachedDatabase
//!   ├── initialize()              -> committed image to load into the catalog
//!   ├── in_memory()               -> shutdown skips the checkpoint when true
//!   ├── create_checkpoint(image)  -> persist the committed catalog image
//!   └── commit(txn, changes)      -> may veto a commit (default: accept)
//! ```
//!
//! ## Implementations
//!
//! | Type | `in_memory()` | Checkpoint |
//! |------|---------------|------------|
//! | [`InMemoryStorage`] | true | no-op |
//! | [`SingleFileStorage`] | false | image file, temp file + rename |
//!
//! Anything else implementing the trait (a test double counting checkpoint
//! attempts, for instance) can be injected through
//! [`crate::DatabaseBuilder::storage`].
//!
//! ## Errors
//!
//! Storage reports use `eyre` with file paths and operations attached as
//! context. The attachment turns them into [`crate::DbError::Attach`],
//! [`crate::DbError::Storage`] or [`crate::DbError::CommitFailed`] depending
//! on where they surface.

mod memory;
mod single_file;

pub use crate::schema::persistence::{CheckpointImage, TableImage};
pub use memory::InMemoryStorage;
pub use single_file::SingleFileStorage;

use crate::mvcc::TxnId;
use crate::schema::CatalogChange;

pub trait StorageManager: Send + Sync {
    /// Brings the storage to a ready state and returns the committed image
    /// it holds. An empty image means a fresh database.
    fn initialize(&self) -> eyre::Result<CheckpointImage>;

    fn in_memory(&self) -> bool;

    /// Persists `image`. `force` is set when the caller checkpoints even
    /// though other transactions are still active.
    fn create_checkpoint(&self, image: &CheckpointImage, force: bool) -> eyre::Result<()>;

    /// Called before a transaction's changes are published. An error rolls
    /// the transaction back instead.
    fn commit(&self, txn_id: TxnId, changes: &[CatalogChange]) -> eyre::Result<()> {
        let _ = (txn_id, changes);
        Ok(())
    }
}

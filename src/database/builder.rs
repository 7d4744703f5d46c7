//! # Database Builder
//!
//! `DatabaseBuilder` configures and opens a [`Database`].
//!
//! ## Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | path | `:memory:` | File path, or `""` / `:memory:` for in-memory |
//! | access_mode | ReadWrite | ReadOnly rejects DDL/DML and never creates files |
//! | checkpoint_on_shutdown | true | Checkpoint when the last handle goes away |
//! | storage | by path | Any [`StorageManager`], overriding the path's default |
//! | extension | none | Extra functions and collations, loaded after `core` |
//!
//! ## Usage Examples
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("./sales.db")
//!     .checkpoint_on_shutdown(false)
//!     .open()?;
//! ```
//!
//! ```ignore
//! let db = Database::builder()
//!     .in_memory()
//!     .extension(MyCollations)
//!     .open()?;
//! ```

use super::{AttachedDatabase, Database};
use crate::config::{AccessMode, DbConfig, IN_MEMORY_PATH};
use crate::error::Result;
use crate::sql::functions::Extension;
use crate::storage::StorageManager;
use std::path::Path;
use std::sync::Arc;

pub struct DatabaseBuilder {
    path: String,
    config: DbConfig,
    storage: Option<Box<dyn StorageManager>>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
            config: DbConfig::default(),
            storage: None,
            extensions: Vec::new(),
        }
    }

    /// Sets the database file. An empty path or `:memory:` selects
    /// in-memory storage.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = path.as_ref().to_string_lossy().into_owned();
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.path = IN_MEMORY_PATH.to_string();
        self
    }

    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.config.access_mode = mode;
        self
    }

    pub fn read_only(self) -> Self {
        self.access_mode(AccessMode::ReadOnly)
    }

    pub fn checkpoint_on_shutdown(mut self, enabled: bool) -> Self {
        self.config.checkpoint_on_shutdown = enabled;
        self
    }

    pub fn config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `storage` instead of the storage manager the path implies.
    pub fn storage(mut self, storage: Box<dyn StorageManager>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn open(self) -> Result<Database> {
        let shared = AttachedDatabase::attach(&self.path, self.config, self.storage, &self.extensions)?;
        Ok(Database::from_attached(shared))
    }
}

use super::{AttachedDatabase, Connection, DatabaseBuilder};
use crate::config::{DbConfig, IN_MEMORY_PATH};
use crate::error::Result;
use std::sync::Arc;

/// Database-level handle. Clones share one attachment; when the last clone
/// goes away the attachment is shut down.
#[derive(Clone)]
pub struct Database {
    pub(crate) handle: Arc<DatabaseHandle>,
}

pub(crate) struct DatabaseHandle {
    pub(crate) shared: Arc<AttachedDatabase>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name())
            .field("path", &self.handle.shared.path())
            .field("detached", &self.is_detached())
            .finish()
    }
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Opens a file-backed database with the default configuration.
    pub fn open(path: &str) -> Result<Self> {
        Self::builder().path(path).open()
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::builder().path(IN_MEMORY_PATH).open()
    }

    pub(crate) fn from_attached(shared: Arc<AttachedDatabase>) -> Self {
        Self {
            handle: Arc::new(DatabaseHandle { shared }),
        }
    }

    pub fn connect(&self) -> Result<Connection> {
        Connection::new(Arc::clone(&self.handle.shared))
    }

    pub fn name(&self) -> &str {
        self.handle.shared.name()
    }

    pub fn config(&self) -> &DbConfig {
        self.handle.shared.config()
    }

    pub fn is_detached(&self) -> bool {
        self.handle.shared.is_detached()
    }

    pub fn is_in_memory(&self) -> bool {
        self.handle.shared.storage().in_memory()
    }
}

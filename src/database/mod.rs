//! # Database Module
//!
//! The client-facing layer: attachments, the database-level handle,
//! connections and prepared statements.
//!
//! ## Ownership
//!
//! ```text
//! Database ──Arc──> DatabaseHandle ──Arc──> AttachedDatabase
//!                                              ├── Box<dyn StorageManager>
//! Connection ──Arc──> ConnectionInner ──Arc──┘ ├── Catalog
//!     ^                  ├── Option<Transaction>└── TransactionManager
//!     │                  └── registry: name -> Arc<StatementInner>
//!     │
//! PreparedStatement ──Weak──> ConnectionInner
//!                   ──Arc───> StatementInner ── BoundPlan ──> [EntryRef]
//! ```
//!
//! Control flows top-down; invalidation flows bottom-up and is detected
//! lazily: a statement checks its connection, the attachment, its creating
//! transaction and its catalog dependencies before each execution.
//!
//! ## Usage Example
//!
//! ```ignore
//! use keeldb::{params, Database};
//!
//! let db = Database::open_in_memory()?;
//! let conn = db.connect()?;
//! conn.execute_batch("CREATE TABLE a (i TINYINT); INSERT INTO a VALUES (11), (12), (13)")?;
//!
//! let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i > $1 AND i < $2");
//! let count = stmt.execute(&params![10, 13])?.scalar();
//! ```

mod attached;
mod builder;
mod connection;
#[allow(clippy::module_inception)]
mod database;
mod lifecycle;
mod prepared;
pub mod row;

pub use attached::{extract_database_name, AttachedDatabase, ShutdownOutcome, SkipReason};
pub use builder::DatabaseBuilder;
pub use connection::Connection;
pub use database::Database;
pub use prepared::PreparedStatement;
pub use row::Row;

use crate::types::OwnedValue;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    CreateTable { created: bool },
    DropTable { dropped: bool },
    Insert { rows_affected: usize },
    Select { columns: Vec<String>, rows: Vec<Row> },
    Begin,
    Commit,
    Rollback,
    Prepare { name: String },
    Deallocate { name: String },
    Checkpoint,
}

impl ExecuteResult {
    pub fn rows(&self) -> &[Row] {
        match self {
            ExecuteResult::Select { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            ExecuteResult::Select { columns, .. } => columns,
            _ => &[],
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            ExecuteResult::Select { rows, .. } => rows,
            _ => Vec::new(),
        }
    }

    /// First column of the first row, if any.
    pub fn scalar(&self) -> Option<&OwnedValue> {
        self.rows().first().and_then(|row| row.get(0))
    }

    pub fn rows_affected(&self) -> usize {
        match self {
            ExecuteResult::Insert { rows_affected } => *rows_affected,
            _ => 0,
        }
    }
}

//! # KeelDB - Embedded SQL Database Core
//!
//! KeelDB is the resource-lifetime and transactional core of an embedded SQL
//! database: how an attachment, its catalog and transaction manager, and the
//! client handles built on top (connections, prepared statements) are
//! created, nested, invalidated and torn down consistently.
//!
//! ## Quick Start
//!
//! ```ignore
//! use keeldb::{params, Database};
//!
//! let db = Database::builder()
//!     .path("./sales.db")
//!     .open()?;
//! let conn = db.connect()?;
//!
//! conn.execute_batch("CREATE TABLE a (i TINYINT); INSERT INTO a VALUES (11), (12), (13)")?;
//!
//! let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i = $1");
//! let result = stmt.execute(&params![12])?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Database / Connection / PreparedStatement   │
//! ├──────────────────────────────────────────────┤
//! │  SQL: lexer -> parser -> binder -> executor  │
//! ├──────────────────────┬───────────────────────┤
//! │  Catalog (versioned) │  MVCC transactions    │
//! ├──────────────────────┴───────────────────────┤
//! │  StorageManager (in-memory / single file)    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: `DbConfig`, `AccessMode` and crate constants
//! - [`database`]: attachments, handles, connections, prepared statements
//! - [`mvcc`]: transaction manager, snapshots and version stamps
//! - [`schema`]: catalog entries, tables and checkpoint images
//! - [`sql`]: dialect front end, binder, executor, functions
//! - [`storage`]: `StorageManager` and its implementations
//! - [`types`]: `DataType` and `OwnedValue`

#[macro_use]
mod macros;

pub mod config;
pub mod database;
pub mod error;
pub mod mvcc;
pub mod schema;
pub mod sql;
pub mod storage;
pub mod types;

pub use config::{AccessMode, DbConfig};
pub use database::{
    Connection, Database, DatabaseBuilder, ExecuteResult, PreparedStatement, Row,
    ShutdownOutcome, SkipReason,
};
pub use error::{DbError, InvalidationCause, ParameterError, Result};
pub use sql::functions::{Collation, Extension, FunctionRegistrar, ScalarFunction};
pub use storage::{InMemoryStorage, SingleFileStorage, StorageManager};
pub use types::{DataType, OwnedValue};

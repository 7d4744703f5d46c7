//! # Database Lifecycle Operations
//!
//! Shutdown and detach of a [`Database`].
//!
//! ## Two-Phase Teardown
//!
//! ```text
//! detach() / last handle dropped
//!     │
//!     ├── 1. mark attachment detached      (connections fail new work)
//!     └── 2. checkpoint unless skipped     (errors logged, never raised)
//! ```
//!
//! Teardown is explicit and non-failing: `shutdown()` returns a
//! [`ShutdownOutcome`] instead of an error, and the `Drop` path passes
//! `std::thread::panicking()` so a handle dropped while unwinding never
//! writes a checkpoint of possibly half-applied state.
//!
//! ## Usage
//!
//! ```ignore
//! let db = Database::open("./sales.db")?;
//! // ... use database ...
//! assert_eq!(db.detach(), ShutdownOutcome::Checkpointed);
//! ```

use super::database::DatabaseHandle;
use super::{Database, ShutdownOutcome};

impl Database {
    /// Runs the shutdown protocol now. Idempotent: later calls and the
    /// eventual drop report `Skipped(AlreadyShutDown)`.
    pub fn shutdown(&self) -> ShutdownOutcome {
        self.handle.shared.shutdown(false)
    }

    /// Shuts the attachment down and releases this handle.
    pub fn detach(self) -> ShutdownOutcome {
        self.shutdown()
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        self.shared.shutdown(std::thread::panicking());
    }
}

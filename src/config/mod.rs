//! # Configuration
//!
//! Configuration is an explicit value, [`DbConfig`], handed to attach. Nothing
//! in the crate reads ambient global settings: two attachments in the same
//! process can run with different access modes and shutdown policies.
//!
//! ## Module Organization
//!
//! - [`constants`]: fixed names, file-format markers and limits
//! - [`DbConfig`] / [`AccessMode`]: the per-attachment options

pub mod constants;
pub use constants::*;

/// Whether an attachment accepts writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// Options consumed by [`crate::AttachedDatabase::attach`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub access_mode: AccessMode,
    /// Checkpoint file-backed storage when the last database handle goes away.
    pub checkpoint_on_shutdown: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::ReadWrite,
            checkpoint_on_shutdown: true,
        }
    }
}

impl DbConfig {
    pub fn read_only(&self) -> bool {
        self.access_mode == AccessMode::ReadOnly
    }
}

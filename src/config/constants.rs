//! # Constants
//!
//! Fixed names, checkpoint-file markers and limits. Values that are written
//! to disk (`CHECKPOINT_MAGIC`, `CHECKPOINT_VERSION`) must only change
//! together with a format bump.

/// Path literal that requests an in-memory attachment.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Attachment name used for in-memory or unnamed databases.
pub const MEMORY_DATABASE_NAME: &str = "memory";

/// First 16 bytes of every checkpoint file.
pub const CHECKPOINT_MAGIC: &[u8; 16] = b"KeelDB ckpt v1\0\0";

pub const CHECKPOINT_VERSION: u32 = 1;

/// Suffix of the scratch file a checkpoint is written to before the rename.
pub const CHECKPOINT_TMP_SUFFIX: &str = ".tmp";

/// Prefix of auto-generated prepared statement names.
pub const PREPARED_NAME_PREFIX: &str = "__keeldb_prepared_";

/// Highest parameter number (`$n`) a statement may reference.
pub const MAX_PARAMETERS: usize = 65_535;

/// Hard limit on concurrently active transactions per attachment.
pub const MAX_CONCURRENT_TXNS: usize = 64;

/// Transaction id reserved for bootstrapped, always-visible catalog state.
pub const BOOTSTRAP_TXN_ID: u64 = 0;

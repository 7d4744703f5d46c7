//! # Crate Macros
//!
//! ## params!
//!
//! Builds the argument vector for a prepared statement. Every element goes
//! through `OwnedValue::from`, so integers, floats, booleans, strings and
//! `Option<T>` (NULL for `None`) can be mixed freely.
//!
//! ```ignore
//! use keeldb::params;
//!
//! let stmt = conn.prepare("INSERT INTO users VALUES ($1, $2, $3)");
//! stmt.execute(&params![1, "Alice", None::<i64>])?;
//! ```

/// Builds a `Vec<OwnedValue>` from heterogeneous values.
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::types::OwnedValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::types::OwnedValue::from($value)),+]
    };
}

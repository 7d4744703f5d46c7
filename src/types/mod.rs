//! # Value and Type System
//!
//! This module provides the small type system the binder and executor work
//! with. Statement parameters are typed against it at prepare time and every
//! argument supplied to `execute` is coerced through it.
//!
//! ## Module Structure
//!
//! - `data_type`: `DataType` discriminant used by columns, casts and parameters
//! - `owned_value`: `OwnedValue`, the heap-owned runtime value
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `DataType` | Column / cast / parameter type |
//! | `OwnedValue` | Runtime value (arguments, rows, results) |
//! | `ArithmeticOp` | Binary arithmetic on values |
//!
//! ## Implicit vs Explicit Casts
//!
//! ```text
//! coerce()  implicit: used for execute arguments and INSERT targets
//!           Int -> any integer type (range checked), Int -> Double,
//!           integral Double -> integer, number -> Varchar,
//!           parseable Varchar -> number / Boolean, NULL -> anything
//!
//! cast()    explicit: `expr::TYPE` and `CAST(expr AS TYPE)`
//!           everything coerce() allows, plus Double -> integer (rounded)
//!           and Boolean <-> integer
//! ```

mod data_type;
mod owned_value;

pub use data_type::DataType;
pub use owned_value::{ArithmeticOp, OwnedValue};

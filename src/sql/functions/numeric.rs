//! # Numeric Functions
//!
//! - `ABS(x)` - absolute value, computed in DOUBLE

use super::{FunctionRegistrar, ScalarFunction};
use crate::types::{DataType, OwnedValue};

pub(super) fn register(registrar: &mut FunctionRegistrar) {
    registrar.scalar(ScalarFunction::new(
        "abs",
        vec![DataType::Float8],
        DataType::Float8,
        eval_abs,
    ));
}

fn eval_abs(args: &[OwnedValue]) -> Result<OwnedValue, String> {
    match args.first() {
        Some(OwnedValue::Int(n)) => n
            .checked_abs()
            .map(OwnedValue::Int)
            .ok_or_else(|| "integer out of range in abs()".to_string()),
        Some(OwnedValue::Float(f)) => Ok(OwnedValue::Float(f.abs())),
        _ => Err("abs() expects a numeric argument".to_string()),
    }
}

//! # String Functions
//!
//! - `LOWER(str)` / `UPPER(str)` - case conversion
//! - `LENGTH(str)` - character count
//! - `CONCAT(s1, s2, ...)` - concatenation, variadic

use super::{FunctionRegistrar, ScalarFunction};
use crate::types::{DataType, OwnedValue};

pub(super) fn register(registrar: &mut FunctionRegistrar) {
    registrar
        .scalar(ScalarFunction::new(
            "lower",
            vec![DataType::Varchar],
            DataType::Varchar,
            eval_lower,
        ))
        .scalar(ScalarFunction::new(
            "upper",
            vec![DataType::Varchar],
            DataType::Varchar,
            eval_upper,
        ))
        .scalar(ScalarFunction::new(
            "length",
            vec![DataType::Varchar],
            DataType::Int8,
            eval_length,
        ))
        .scalar(
            ScalarFunction::new("concat", vec![DataType::Varchar], DataType::Varchar, eval_concat)
                .variadic(),
        );
}

fn text_arg(args: &[OwnedValue]) -> Result<&str, String> {
    args.first()
        .and_then(OwnedValue::as_str)
        .ok_or_else(|| "expected a VARCHAR argument".to_string())
}

fn eval_lower(args: &[OwnedValue]) -> Result<OwnedValue, String> {
    Ok(OwnedValue::Text(text_arg(args)?.to_lowercase()))
}

fn eval_upper(args: &[OwnedValue]) -> Result<OwnedValue, String> {
    Ok(OwnedValue::Text(text_arg(args)?.to_uppercase()))
}

fn eval_length(args: &[OwnedValue]) -> Result<OwnedValue, String> {
    Ok(OwnedValue::Int(text_arg(args)?.chars().count() as i64))
}

fn eval_concat(args: &[OwnedValue]) -> Result<OwnedValue, String> {
    let mut out = String::new();
    for arg in args {
        out.push_str(arg.as_str().unwrap_or_default());
    }
    Ok(OwnedValue::Text(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> OwnedValue {
        OwnedValue::Text(s.to_string())
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(eval_length(&[text("héllo")]), Ok(OwnedValue::Int(5)));
    }

    #[test]
    fn concat_joins_all_arguments() {
        assert_eq!(
            eval_concat(&[text("a"), text("b"), text("c")]),
            Ok(text("abc"))
        );
    }

    #[test]
    fn case_conversion() {
        assert_eq!(eval_upper(&[text("MiXed")]), Ok(text("MIXED")));
        assert_eq!(eval_lower(&[text("MiXed")]), Ok(text("mixed")));
    }
}

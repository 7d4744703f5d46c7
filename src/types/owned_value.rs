//! # Heap-Owned Value Representation
//!
//! `OwnedValue` is the only runtime value in the crate: execute arguments,
//! stored rows, expression results and query output all use it. Values own
//! their data so rows can outlive the statement that produced them.
//!
//! ## Conversion
//!
//! Rust primitives convert into values through `From`, which is what lets
//! `params![12, "test"]` build an argument list:
//!
//! ```ignore
//! let v: OwnedValue = 12i8.into();      // OwnedValue::Int(12)
//! let s: OwnedValue = "test".into();    // OwnedValue::Text("test")
//! let n: OwnedValue = None::<i64>.into(); // OwnedValue::Null
//! ```

use super::DataType;
use std::cmp::Ordering;
use std::fmt;

/// Fully-owned SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

impl OwnedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, OwnedValue::Null)
    }

    /// The natural type of this value, `None` for NULL.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            OwnedValue::Null => None,
            OwnedValue::Bool(_) => Some(DataType::Bool),
            OwnedValue::Int(_) => Some(DataType::Int8),
            OwnedValue::Float(_) => Some(DataType::Float8),
            OwnedValue::Text(_) => Some(DataType::Varchar),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OwnedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OwnedValue::Int(i) => Some(*i as f64),
            OwnedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OwnedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OwnedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Implicit coercion into `target`, `None` when the value does not fit.
    pub fn coerce(&self, target: DataType) -> Option<OwnedValue> {
        match (self, target) {
            (OwnedValue::Null, _) => Some(OwnedValue::Null),
            (OwnedValue::Bool(b), DataType::Bool) => Some(OwnedValue::Bool(*b)),
            (OwnedValue::Bool(b), DataType::Varchar) => Some(OwnedValue::Text(b.to_string())),
            (OwnedValue::Int(i), t) if t.is_integer() => fit_integer(*i, t),
            (OwnedValue::Int(i), DataType::Float8) => Some(OwnedValue::Float(*i as f64)),
            (OwnedValue::Int(i), DataType::Varchar) => Some(OwnedValue::Text(i.to_string())),
            (OwnedValue::Float(f), DataType::Float8) => Some(OwnedValue::Float(*f)),
            (OwnedValue::Float(f), t) if t.is_integer() => {
                if f.fract() == 0.0 && f.is_finite() {
                    fit_integer(*f as i64, t)
                } else {
                    None
                }
            }
            (OwnedValue::Float(f), DataType::Varchar) => Some(OwnedValue::Text(f.to_string())),
            (OwnedValue::Text(s), DataType::Varchar) => Some(OwnedValue::Text(s.clone())),
            (OwnedValue::Text(s), t) if t.is_integer() => {
                s.trim().parse::<i64>().ok().and_then(|i| fit_integer(i, t))
            }
            (OwnedValue::Text(s), DataType::Float8) => {
                s.trim().parse::<f64>().ok().map(OwnedValue::Float)
            }
            (OwnedValue::Text(s), DataType::Bool) => match s.trim().to_ascii_lowercase().as_str()
            {
                "true" | "t" | "1" => Some(OwnedValue::Bool(true)),
                "false" | "f" | "0" => Some(OwnedValue::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Explicit cast into `target`; a superset of [`OwnedValue::coerce`].
    pub fn cast(&self, target: DataType) -> Option<OwnedValue> {
        if let Some(v) = self.coerce(target) {
            return Some(v);
        }
        match (self, target) {
            (OwnedValue::Float(f), t) if t.is_integer() && f.is_finite() => {
                fit_integer(f.round() as i64, t)
            }
            (OwnedValue::Bool(b), t) if t.is_integer() => Some(OwnedValue::Int(*b as i64)),
            (OwnedValue::Int(i), DataType::Bool) => Some(OwnedValue::Bool(*i != 0)),
            _ => None,
        }
    }

    /// SQL comparison; `None` when either side is NULL or the types are unrelated.
    pub fn compare(&self, other: &OwnedValue) -> Option<Ordering> {
        match (self, other) {
            (OwnedValue::Null, _) | (_, OwnedValue::Null) => None,
            (OwnedValue::Int(a), OwnedValue::Int(b)) => Some(a.cmp(b)),
            (OwnedValue::Bool(a), OwnedValue::Bool(b)) => Some(a.cmp(b)),
            (OwnedValue::Text(a), OwnedValue::Text(b)) => Some(a.cmp(b)),
            (OwnedValue::Text(s), v) if v.as_f64().is_some() => {
                let parsed = s.trim().parse::<f64>().ok()?;
                parsed.partial_cmp(&v.as_f64()?)
            }
            (v, OwnedValue::Text(s)) if v.as_f64().is_some() => {
                let parsed = s.trim().parse::<f64>().ok()?;
                v.as_f64()?.partial_cmp(&parsed)
            }
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Total order used for sorting: NULLs first, then by [`OwnedValue::compare`].
    pub fn sort_cmp(&self, other: &OwnedValue) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    pub fn apply_arithmetic(&self, op: ArithmeticOp, other: &OwnedValue) -> Result<OwnedValue, String> {
        if self.is_null() || other.is_null() {
            return Ok(OwnedValue::Null);
        }
        match (self, other) {
            (OwnedValue::Int(a), OwnedValue::Int(b)) => {
                let result = match op {
                    ArithmeticOp::Add => a.checked_add(*b),
                    ArithmeticOp::Sub => a.checked_sub(*b),
                    ArithmeticOp::Mul => a.checked_mul(*b),
                    ArithmeticOp::Div => {
                        if *b == 0 {
                            return Err("division by zero".to_string());
                        }
                        a.checked_div(*b)
                    }
                    ArithmeticOp::Mod => {
                        if *b == 0 {
                            return Err("division by zero".to_string());
                        }
                        a.checked_rem(*b)
                    }
                };
                result
                    .map(OwnedValue::Int)
                    .ok_or_else(|| format!("integer overflow in {} {} {}", a, op.symbol(), b))
            }
            (a, b) => {
                let (x, y) = match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => (x, y),
                    _ => {
                        return Err(format!(
                            "cannot apply '{}' to {} and {}",
                            op.symbol(),
                            a,
                            b
                        ))
                    }
                };
                let result = match op {
                    ArithmeticOp::Add => x + y,
                    ArithmeticOp::Sub => x - y,
                    ArithmeticOp::Mul => x * y,
                    ArithmeticOp::Div => x / y,
                    ArithmeticOp::Mod => x % y,
                };
                Ok(OwnedValue::Float(result))
            }
        }
    }
}

fn fit_integer(value: i64, target: DataType) -> Option<OwnedValue> {
    let (min, max) = target.integer_range()?;
    if value < min || value > max {
        return None;
    }
    Some(OwnedValue::Int(value))
}

impl fmt::Display for OwnedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnedValue::Null => f.write_str("NULL"),
            OwnedValue::Bool(b) => write!(f, "{}", b),
            OwnedValue::Int(i) => write!(f, "{}", i),
            OwnedValue::Float(v) => write!(f, "{}", v),
            OwnedValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for OwnedValue {
                fn from(v: $ty) -> Self {
                    OwnedValue::Int(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for OwnedValue {
    fn from(v: f32) -> Self {
        OwnedValue::Float(v as f64)
    }
}

impl From<f64> for OwnedValue {
    fn from(v: f64) -> Self {
        OwnedValue::Float(v)
    }
}

impl From<bool> for OwnedValue {
    fn from(v: bool) -> Self {
        OwnedValue::Bool(v)
    }
}

impl From<&str> for OwnedValue {
    fn from(v: &str) -> Self {
        OwnedValue::Text(v.to_string())
    }
}

impl From<String> for OwnedValue {
    fn from(v: String) -> Self {
        OwnedValue::Text(v)
    }
}

impl<T: Into<OwnedValue>> From<Option<T>> for OwnedValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => OwnedValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_coercion_is_range_checked() {
        assert_eq!(
            OwnedValue::Int(12).coerce(DataType::Int1),
            Some(OwnedValue::Int(12))
        );
        assert_eq!(OwnedValue::Int(300).coerce(DataType::Int1), None);
        assert_eq!(
            OwnedValue::Int(300).coerce(DataType::Int2),
            Some(OwnedValue::Int(300))
        );
    }

    #[test]
    fn text_coerces_only_when_it_parses() {
        assert_eq!(
            OwnedValue::from("42").coerce(DataType::Int4),
            Some(OwnedValue::Int(42))
        );
        assert_eq!(OwnedValue::from("forty").coerce(DataType::Int4), None);
        assert_eq!(
            OwnedValue::from("t").coerce(DataType::Bool),
            Some(OwnedValue::Bool(true))
        );
    }

    #[test]
    fn fractional_float_does_not_coerce_but_casts() {
        let v = OwnedValue::Float(2.6);
        assert_eq!(v.coerce(DataType::Int4), None);
        assert_eq!(v.cast(DataType::Int4), Some(OwnedValue::Int(3)));
        assert_eq!(
            OwnedValue::Float(4.0).coerce(DataType::Int8),
            Some(OwnedValue::Int(4))
        );
    }

    #[test]
    fn null_coerces_to_everything() {
        for tag in 0..=6u8 {
            let dt = DataType::from_u8(tag).unwrap();
            assert_eq!(OwnedValue::Null.coerce(dt), Some(OwnedValue::Null));
        }
    }

    #[test]
    fn compare_mixes_int_and_float() {
        assert_eq!(
            OwnedValue::Int(2).compare(&OwnedValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(OwnedValue::Null.compare(&OwnedValue::Int(1)), None);
    }

    #[test]
    fn integer_arithmetic_reports_overflow_and_division_by_zero() {
        let max = OwnedValue::Int(i64::MAX);
        assert!(max
            .apply_arithmetic(ArithmeticOp::Add, &OwnedValue::Int(1))
            .is_err());
        assert!(OwnedValue::Int(1)
            .apply_arithmetic(ArithmeticOp::Div, &OwnedValue::Int(0))
            .is_err());
        assert_eq!(
            OwnedValue::Int(3)
                .apply_arithmetic(ArithmeticOp::Add, &OwnedValue::Int(5))
                .unwrap(),
            OwnedValue::Int(8)
        );
    }

    #[test]
    fn sort_cmp_puts_nulls_first() {
        let mut values = vec![OwnedValue::Int(3), OwnedValue::Null, OwnedValue::Int(1)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![OwnedValue::Null, OwnedValue::Int(1), OwnedValue::Int(3)]
        );
    }
}

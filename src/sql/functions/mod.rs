//! # SQL Functions Module
//!
//! Scalar functions and collations are not hard-wired into the binder. They
//! are catalog entries, registered by extensions when a database is
//! attached, and resolved by name like tables are. A plan that calls
//! `lower(...)` or sorts `COLLATE nocase` therefore depends on those entries
//! exactly as it depends on the tables it reads.
//!
//! ## Module Structure
//!
//! - `string`: `LOWER`, `UPPER`, `LENGTH`, `CONCAT`
//! - `numeric`: `ABS`
//!
//! ## Registration Contract
//!
//! ```text
//! Extension::load(&mut FunctionRegistrar)
//!     ├── registrar.scalar(ScalarFunction { name, arg_types, return_type, func })
//!     └── registrar.collation(Collation { name, sort_key })
//!
//! attach: every registered object -> Catalog::create_base_entry
//! ```
//!
//! The built-in [`CoreExtension`] is always loaded first. User extensions
//! passed to [`crate::DatabaseBuilder::extension`] load after it and may not
//! reuse a name it registered.
//!
//! ## Value Handling
//!
//! Arguments are coerced to the declared `arg_types` before the
//! implementation runs. A NULL argument short-circuits to NULL without
//! calling the implementation.

mod numeric;
mod string;

use crate::types::{DataType, OwnedValue};
use std::fmt;
use std::sync::Arc;

pub type ScalarImpl = Arc<dyn Fn(&[OwnedValue]) -> Result<OwnedValue, String> + Send + Sync>;
pub type SortKeyImpl = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone)]
pub struct ScalarFunction {
    pub name: String,
    pub arg_types: Vec<DataType>,
    /// Last argument type repeats for any further arguments.
    pub variadic: bool,
    pub return_type: DataType,
    pub func: ScalarImpl,
}

impl fmt::Debug for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunction")
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .field("variadic", &self.variadic)
            .field("return_type", &self.return_type)
            .finish()
    }
}

impl ScalarFunction {
    pub fn new<F>(name: &str, arg_types: Vec<DataType>, return_type: DataType, func: F) -> Self
    where
        F: Fn(&[OwnedValue]) -> Result<OwnedValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_ascii_lowercase(),
            arg_types,
            variadic: false,
            return_type,
            func: Arc::new(func),
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn accepts_arity(&self, n: usize) -> bool {
        if self.variadic {
            n >= self.arg_types.len()
        } else {
            n == self.arg_types.len()
        }
    }

    /// Declared type of argument `idx`.
    pub fn arg_type(&self, idx: usize) -> Option<DataType> {
        match self.arg_types.get(idx) {
            Some(t) => Some(*t),
            None if self.variadic => self.arg_types.last().copied(),
            None => None,
        }
    }

    pub fn invoke(&self, args: &[OwnedValue]) -> Result<OwnedValue, String> {
        let mut coerced = Vec::with_capacity(args.len());
        for (idx, arg) in args.iter().enumerate() {
            if arg.is_null() {
                return Ok(OwnedValue::Null);
            }
            let target = self
                .arg_type(idx)
                .ok_or_else(|| format!("{}() takes no argument {}", self.name, idx + 1))?;
            let value = arg.coerce(target).ok_or_else(|| {
                format!(
                    "{}() argument {} expects {} but got {}",
                    self.name,
                    idx + 1,
                    target,
                    arg
                )
            })?;
            coerced.push(value);
        }
        (self.func)(&coerced)
    }
}

#[derive(Clone)]
pub struct Collation {
    pub name: String,
    pub sort_key: SortKeyImpl,
}

impl fmt::Debug for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collation").field("name", &self.name).finish()
    }
}

impl Collation {
    pub fn new<F>(name: &str, sort_key: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.to_ascii_lowercase(),
            sort_key: Arc::new(sort_key),
        }
    }

    pub fn key(&self, value: &str) -> String {
        (self.sort_key)(value)
    }
}

/// Collects the objects an [`Extension`] contributes.
#[derive(Debug, Default)]
pub struct FunctionRegistrar {
    functions: Vec<ScalarFunction>,
    collations: Vec<Collation>,
}

impl FunctionRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(&mut self, function: ScalarFunction) -> &mut Self {
        self.functions.push(function);
        self
    }

    pub fn collation(&mut self, collation: Collation) -> &mut Self {
        self.collations.push(collation);
        self
    }

    pub fn into_parts(self) -> (Vec<ScalarFunction>, Vec<Collation>) {
        (self.functions, self.collations)
    }
}

pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self, registrar: &mut FunctionRegistrar);
}

/// Functions and collations every attachment starts with.
#[derive(Debug, Default)]
pub struct CoreExtension;

impl Extension for CoreExtension {
    fn name(&self) -> &str {
        "core"
    }

    fn load(&self, registrar: &mut FunctionRegistrar) {
        string::register(registrar);
        numeric::register(registrar);
        registrar
            .collation(Collation::new("binary", |s| s.to_string()))
            .collation(Collation::new("nocase", |s| s.to_lowercase()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_extension_registers_functions_and_collations() {
        let mut registrar = FunctionRegistrar::new();
        CoreExtension.load(&mut registrar);
        let (functions, collations) = registrar.into_parts();
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        for expected in ["lower", "upper", "length", "concat", "abs"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        assert_eq!(collations.len(), 2);
    }

    #[test]
    fn null_argument_short_circuits() {
        let f = ScalarFunction::new("boom", vec![DataType::Varchar], DataType::Varchar, |_| {
            Err("called".to_string())
        });
        assert_eq!(f.invoke(&[OwnedValue::Null]), Ok(OwnedValue::Null));
    }

    #[test]
    fn arguments_are_coerced_to_declared_types() {
        let f = ScalarFunction::new("echo", vec![DataType::Varchar], DataType::Varchar, |args| {
            Ok(args[0].clone())
        });
        assert_eq!(
            f.invoke(&[OwnedValue::Int(7)]),
            Ok(OwnedValue::Text("7".to_string()))
        );
    }

    #[test]
    fn variadic_functions_accept_extra_arguments() {
        let f = ScalarFunction::new("v", vec![DataType::Varchar], DataType::Varchar, |_| {
            Ok(OwnedValue::Null)
        })
        .variadic();
        assert!(f.accepts_arity(3));
        assert!(!f.accepts_arity(0));
        assert_eq!(f.arg_type(5), Some(DataType::Varchar));
    }

    #[test]
    fn nocase_collation_folds_case() {
        let mut registrar = FunctionRegistrar::new();
        CoreExtension.load(&mut registrar);
        let (_, collations) = registrar.into_parts();
        let nocase = collations.iter().find(|c| c.name == "nocase").unwrap();
        assert_eq!(nocase.key("AbC"), "abc");
    }
}

use crate::types::OwnedValue;
use eyre::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<OwnedValue>,
}

impl Row {
    pub fn new(values: Vec<OwnedValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&OwnedValue> {
        self.values.get(index)
    }

    pub fn get_int(&self, index: usize) -> Result<i64> {
        match self.get(index) {
            Some(OwnedValue::Int(i)) => Ok(*i),
            Some(other) => bail!("expected INT, got {:?}", other),
            None => bail!("column {} out of bounds", index),
        }
    }

    pub fn get_float(&self, index: usize) -> Result<f64> {
        match self.get(index) {
            Some(OwnedValue::Float(f)) => Ok(*f),
            Some(other) => bail!("expected DOUBLE, got {:?}", other),
            None => bail!("column {} out of bounds", index),
        }
    }

    pub fn get_text(&self, index: usize) -> Result<&str> {
        match self.get(index) {
            Some(OwnedValue::Text(s)) => Ok(s),
            Some(other) => bail!("expected VARCHAR, got {:?}", other),
            None => bail!("column {} out of bounds", index),
        }
    }

    pub fn get_bool(&self, index: usize) -> Result<bool> {
        match self.get(index) {
            Some(OwnedValue::Bool(b)) => Ok(*b),
            Some(other) => bail!("expected BOOLEAN, got {:?}", other),
            None => bail!("column {} out of bounds", index),
        }
    }

    pub fn is_null(&self, index: usize) -> bool {
        matches!(self.get(index), Some(OwnedValue::Null))
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_check_the_variant() {
        let row = Row::new(vec![
            OwnedValue::Int(3),
            OwnedValue::from("x"),
            OwnedValue::Null,
        ]);
        assert_eq!(row.get_int(0).unwrap(), 3);
        assert_eq!(row.get_text(1).unwrap(), "x");
        assert!(row.get_int(1).is_err());
        assert!(row.get_bool(5).is_err());
        assert!(row.is_null(2));
        assert_eq!(row.column_count(), 3);
    }
}

//! # Data Types
//!
//! `DataType` is the single type discriminant shared by column definitions,
//! cast expressions, inferred parameter types and the checkpoint image.
//!
//! ## Discriminant Values
//!
//! The `#[repr(u8)]` discriminant is written verbatim into checkpoint files,
//! so existing values must never be renumbered.
//!
//! | Type | Tag | SQL spellings |
//! |------|-----|---------------|
//! | Bool | 0 | BOOLEAN, BOOL |
//! | Int1 | 1 | TINYINT |
//! | Int2 | 2 | SMALLINT |
//! | Int4 | 3 | INTEGER, INT |
//! | Int8 | 4 | BIGINT |
//! | Float8 | 5 | DOUBLE, REAL, FLOAT |
//! | Varchar | 6 | VARCHAR, TEXT |

use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool = 0,
    Int1 = 1,
    Int2 = 2,
    Int4 = 3,
    Int8 = 4,
    Float8 = 5,
    Varchar = 6,
}

impl DataType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Bool),
            1 => Some(DataType::Int1),
            2 => Some(DataType::Int2),
            3 => Some(DataType::Int4),
            4 => Some(DataType::Int8),
            5 => Some(DataType::Float8),
            6 => Some(DataType::Varchar),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "BOOLEAN",
            DataType::Int1 => "TINYINT",
            DataType::Int2 => "SMALLINT",
            DataType::Int4 => "INTEGER",
            DataType::Int8 => "BIGINT",
            DataType::Float8 => "DOUBLE",
            DataType::Varchar => "VARCHAR",
        }
    }

    /// Parses a SQL type name, case-insensitively.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => Some(DataType::Bool),
            "TINYINT" => Some(DataType::Int1),
            "SMALLINT" => Some(DataType::Int2),
            "INTEGER" | "INT" => Some(DataType::Int4),
            "BIGINT" => Some(DataType::Int8),
            "DOUBLE" | "REAL" | "FLOAT" => Some(DataType::Float8),
            "VARCHAR" | "TEXT" => Some(DataType::Varchar),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int1 | DataType::Int2 | DataType::Int4 | DataType::Int8
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataType::Float8)
    }

    /// Inclusive value range of an integer type.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            DataType::Int1 => Some((i8::MIN as i64, i8::MAX as i64)),
            DataType::Int2 => Some((i16::MIN as i64, i16::MAX as i64)),
            DataType::Int4 => Some((i32::MIN as i64, i32::MAX as i64)),
            DataType::Int8 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Result type of arithmetic between two operand types.
    pub fn arithmetic_result(left: DataType, right: DataType) -> Option<DataType> {
        if !left.is_numeric() || !right.is_numeric() {
            return None;
        }
        if left == DataType::Float8 || right == DataType::Float8 {
            return Some(DataType::Float8);
        }
        Some(if (left as u8) >= (right as u8) {
            left
        } else {
            right
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

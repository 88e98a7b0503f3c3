//! Scalar values and column types.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TileError};

/// A single scalar value held by a data point.
///
/// `Null` is accepted in every column; it is carried through every round
/// trip and ignored by the statistics engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Integer value (i64).
    Integer(i64),
    /// Floating point value (f64).
    Float(f64),
    /// String value.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl Value {
    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the value as a string reference, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is one.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The column type this value naturally belongs to, `None` for null.
    pub fn natural_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnType::Int),
            Value::Float(_) => Some(ColumnType::Float),
            Value::String(_) => Some(ColumnType::String),
            Value::Boolean(_) => Some(ColumnType::Bool),
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self.natural_type() {
            Some(column_type) => column_type.as_str(),
            None => "null",
        }
    }

    /// Convert a JSON value into a scalar.
    ///
    /// Arrays and objects are rejected: data points only hold scalars. So
    /// are integers above `i64::MAX`, which a float could not hold exactly.
    pub fn from_json(column: &str, json: &serde_json::Value) -> Result<Value> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_u64() {
                    Err(TileError::invalid_document(format!(
                        "column '{}' holds integer {} outside the 64-bit signed range",
                        column, n
                    )))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(TileError::invalid_document(format!(
                        "column '{}' holds an unrepresentable number {}",
                        column, n
                    )))
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(TileError::invalid_document(format!(
                    "column '{}' holds a nested value; only scalars are supported",
                    column
                )))
            }
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Declared value domain of a column.
///
/// The variant order is the order in which column sections are grouped in
/// the binary data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ColumnType {
    /// Integer values (i64).
    Int,
    /// Floating point values (f64).
    Float,
    /// Boolean values.
    Bool,
    /// String values.
    #[default]
    String,
}

impl ColumnType {
    /// All column types in binary grouping order.
    pub const ALL: [ColumnType; 4] = [
        ColumnType::Int,
        ColumnType::Float,
        ColumnType::Bool,
        ColumnType::String,
    ];

    /// Canonical textual name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::String => "string",
        }
    }

    /// Binary type tag.
    pub fn tag(&self) -> u8 {
        match self {
            ColumnType::Int => 0,
            ColumnType::Float => 1,
            ColumnType::Bool => 2,
            ColumnType::String => 3,
        }
    }

    /// Column type for a binary type tag.
    pub fn from_tag(tag: u8) -> Option<ColumnType> {
        match tag {
            0 => Some(ColumnType::Int),
            1 => Some(ColumnType::Float),
            2 => Some(ColumnType::Bool),
            3 => Some(ColumnType::String),
            _ => None,
        }
    }

    /// Check if this type can represent the given value.
    pub fn can_represent(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnType::Int, Value::Integer(_)) => true,
            (ColumnType::Float, Value::Float(_)) => true,
            (ColumnType::Float, Value::Integer(_)) => true,
            (ColumnType::String, Value::String(_)) => true,
            (ColumnType::Bool, Value::Boolean(_)) => true,
            _ => false,
        }
    }

    /// Check a value against this type and bring it into canonical form.
    ///
    /// Integers stored in a float column become floats, so a constructed
    /// tile compares equal to its decoded form.
    pub fn normalize(&self, column: &str, value: Value) -> Result<Value> {
        if !self.can_represent(&value) {
            return Err(TileError::TypeMismatch {
                column: column.to_string(),
                expected: self.as_str().to_string(),
                found: value.kind_name().to_string(),
            });
        }
        match value {
            Value::Integer(i) if *self == ColumnType::Float => Ok(Value::Float(i as f64)),
            Value::Float(f) if !f.is_finite() => Err(TileError::NonFiniteFloat {
                column: column.to_string(),
            }),
            other => Ok(other),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(ColumnType::Int),
            "float" | "double" => Ok(ColumnType::Float),
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "string" | "str" => Ok(ColumnType::String),
            _ => Err(TileError::UnknownColumnType {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Integer(42).as_float(), Some(42.0));
        assert_eq!(Value::Float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::Boolean(true).as_boolean(), Some(true));

        assert_eq!(Value::Null.as_integer(), None);
        assert_eq!(Value::from("hello").as_integer(), None);
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_value_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"[null, true, 7, -1.5, "a", 9223372036854775807]"#).unwrap();
        let values: Vec<Value> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|v| Value::from_json("c", v).unwrap())
            .collect();
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Boolean(true));
        assert_eq!(values[2], Value::Integer(7));
        assert_eq!(values[3], Value::Float(-1.5));
        assert_eq!(values[4], Value::from("a"));
        assert_eq!(values[5], Value::Integer(i64::MAX));
    }

    #[test]
    fn test_value_from_json_rejects_oversized_integer() {
        let big: serde_json::Value = serde_json::from_str("9223372036854775808").unwrap();
        let err = Value::from_json("id", &big).unwrap_err();
        assert!(matches!(err, TileError::InvalidDocument { .. }));
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_value_from_json_rejects_nested() {
        let nested = serde_json::json!({"lat": 1});
        let err = Value::from_json("pos", &nested).unwrap_err();
        assert!(matches!(err, TileError::InvalidDocument { .. }));
        assert!(err.to_string().contains("'pos'"));
    }

    #[test]
    fn test_column_type_names() {
        for column_type in ColumnType::ALL {
            assert_eq!(column_type.as_str().parse::<ColumnType>().unwrap(), column_type);
            assert_eq!(ColumnType::from_tag(column_type.tag()), Some(column_type));
        }
        assert_eq!("Integer".parse::<ColumnType>().unwrap(), ColumnType::Int);
        assert_eq!("boolean".parse::<ColumnType>().unwrap(), ColumnType::Bool);
        assert!(matches!(
            "decimal".parse::<ColumnType>(),
            Err(TileError::UnknownColumnType { .. })
        ));
        assert_eq!(ColumnType::from_tag(9), None);
    }

    #[test]
    fn test_column_type_can_represent() {
        assert!(ColumnType::Int.can_represent(&Value::Integer(1)));
        assert!(ColumnType::Int.can_represent(&Value::Null));
        assert!(!ColumnType::Int.can_represent(&Value::Float(1.0)));
        assert!(ColumnType::Float.can_represent(&Value::Integer(1)));
        assert!(!ColumnType::Bool.can_represent(&Value::from("true")));
    }

    #[test]
    fn test_normalize_widens_integers_in_float_columns() {
        let value = ColumnType::Float.normalize("x", Value::Integer(3)).unwrap();
        assert_eq!(value, Value::Float(3.0));
        let value = ColumnType::Int.normalize("x", Value::Integer(3)).unwrap();
        assert_eq!(value, Value::Integer(3));
    }

    #[test]
    fn test_normalize_rejects_mismatch_and_non_finite() {
        let err = ColumnType::Int.normalize("x", Value::Float(0.5)).unwrap_err();
        assert!(matches!(err, TileError::TypeMismatch { .. }));
        let err = ColumnType::Float.normalize("x", Value::Float(f64::NAN)).unwrap_err();
        assert!(matches!(err, TileError::NonFiniteFloat { .. }));
    }

    #[test]
    fn test_column_type_grouping_order() {
        let mut types = vec![ColumnType::String, ColumnType::Bool, ColumnType::Int, ColumnType::Float];
        types.sort();
        assert_eq!(types, ColumnType::ALL.to_vec());
    }
}

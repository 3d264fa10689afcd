use std::fmt;
use std::sync::Arc;

use crate::ast::{ArithOp, CompareOp};
use crate::data_type::DataType;
use crate::error::{Error, Result};

/// Represents a single data value stored in the database.
///
/// This enum wraps all supported Rust types into a single type that can be
/// passed around the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 64-bit signed integer value.
    Integer(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning when
    /// rows are copied during joins and projections.
    Text(Arc<str>),
}

impl Value {
    /// Returns the inner integer value if this is a [Value::Integer].
    /// Otherwise, returns `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Float].
    /// Otherwise, returns `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the logical [DataType] corresponding to this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::Text(_) => DataType::Text,
        }
    }

    /// Compares two values with a comparison operator.
    ///
    /// Values compare only within the same tag. Numeric tags support the
    /// full operator set; TEXT supports only `=` and `!=` (there is no
    /// ordering on strings in this grammar). Anything else is a type
    /// error, never a silently-false result.
    ///
    /// Float equality uses an epsilon comparison.
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool> {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => Ok(match op {
                CompareOp::Eq => l == r,
                CompareOp::NotEq => l != r,
                CompareOp::Less => l < r,
                CompareOp::LessEq => l <= r,
                CompareOp::Greater => l > r,
                CompareOp::GreaterEq => l >= r,
            }),
            (Value::Float(l), Value::Float(r)) => {
                let eq = (l - r).abs() < f64::EPSILON;
                Ok(match op {
                    CompareOp::Eq => eq,
                    CompareOp::NotEq => !eq,
                    CompareOp::Less => l < r,
                    CompareOp::LessEq => l < r || eq,
                    CompareOp::Greater => l > r,
                    CompareOp::GreaterEq => l > r || eq,
                })
            }
            (Value::Text(l), Value::Text(r)) => match op {
                CompareOp::Eq => Ok(l == r),
                CompareOp::NotEq => Ok(l != r),
                _ => Err(Error::Table {
                    message: format!("operator {} is not supported for TEXT values", op),
                }),
            },
            (l, r) => Err(Error::Table {
                message: format!(
                    "cannot compare {} value {:?} with {} value {:?}",
                    l.data_type(),
                    l,
                    r.data_type(),
                    r
                ),
            }),
        }
    }

    /// Applies an arithmetic operator to two values.
    ///
    /// Arithmetic follows the same strict tag rule as comparison:
    /// Integer with Integer yields Integer, Float with Float yields Float,
    /// and every other combination (including any TEXT operand) is a type
    /// error. There is no implicit numeric coercion.
    pub fn arithmetic(&self, op: ArithOp, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(match op {
                ArithOp::Add => l + r,
                ArithOp::Sub => l - r,
                ArithOp::Mul => l * r,
            })),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(match op {
                ArithOp::Add => l + r,
                ArithOp::Sub => l - r,
                ArithOp::Mul => l * r,
            })),
            (l, r) => Err(Error::Table {
                message: format!(
                    "cannot apply {} to {} value {:?} and {} value {:?}",
                    op,
                    l.data_type(),
                    l,
                    r.data_type(),
                    r
                ),
            }),
        }
    }
}

impl fmt::Display for Value {
    /// Renders the bare value: integers and floats as written by their
    /// default formatting, text as its unquoted content. Quoting is the
    /// concern of the surface that needs it (CSV writer, snapshot codec).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

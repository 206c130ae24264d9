//! Dynamic values produced by parsing and handed to command functions.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::canon::Command;

/// A parsed value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Command(Arc<Command>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&Arc<Command>> {
        match self {
            Value::Command(command) => Some(command),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Command(a), Value::Command(b)) => Arc::ptr_eq(a, b) || a.name() == b.name(),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{}", format_number(*value)),
            Value::String(value) => f.write_str(value),
            Value::Array(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Value::Command(command) => f.write_str(command.name()),
        }
    }
}

/// Formats a number the way it would be typed: integral values have no
/// fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

/// The serializable subset of [`Value`]; commands only exist at runtime.
#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ValueRepr>),
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Bool(value) => Value::Bool(value),
            ValueRepr::Number(value) => Value::Number(value),
            ValueRepr::String(value) => Value::String(value),
            ValueRepr::Array(values) => Value::Array(values.into_iter().map(Value::from).collect()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValueRepr::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display_drops_integral_fraction() {
        assert_eq!(Value::Number(6.0).to_string(), "6");
        assert_eq!(Value::Number(-2.0).to_string(), "-2");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_array_display() {
        let value = Value::Array(vec!["x".into(), 3i64.into(), true.into()]);
        assert_eq!(value.to_string(), "x 3 true");
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let values: Vec<Value> = serde_yaml::from_str("[1, 2.5, true, text, [a, b]]").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Number(1.0),
                Value::Number(2.5),
                Value::Bool(true),
                Value::String("text".into()),
                Value::Array(vec!["a".into(), "b".into()]),
            ]
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(4i64).as_f64(), Some(4.0));
        assert_eq!(Value::from("a").as_str(), Some("a"));
        assert_eq!(Value::from("a").as_bool(), None);
        assert!(Value::from(vec![]).as_array().is_some_and(<[Value]>::is_empty));
    }
}

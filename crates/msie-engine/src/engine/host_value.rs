//! Host representation of script values

use std::fmt;

use crate::error::{JsEngineError, NotSupportedTypeError};

/// A script value the host can hold.
///
/// Objects, functions, arrays, errors and symbols have no host form; asking
/// for one is a `NotSupportedType` error.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
}

impl HostValue {
    /// Number values are `Int` when integral and in `i32` range.
    pub fn from_number(value: f64) -> HostValue {
        if value.fract() == 0.0
            && value >= i32::MIN as f64
            && value <= i32::MAX as f64
            && !(value == 0.0 && value.is_sign_negative())
        {
            HostValue::Int(value as i32)
        } else {
            HostValue::Double(value)
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Int(_) => "int",
            HostValue::Double(_) => "double",
            HostValue::String(_) => "string",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Int(value) => Some(*value as f64),
            HostValue::Double(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Undefined => f.write_str("undefined"),
            HostValue::Null => f.write_str("null"),
            HostValue::Bool(value) => write!(f, "{}", value),
            HostValue::Int(value) => write!(f, "{}", value),
            HostValue::Double(value) => write!(f, "{}", value),
            HostValue::String(value) => f.write_str(value),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Double(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

fn mismatch(expected: &str, value: &HostValue) -> JsEngineError {
    NotSupportedTypeError::new(format!("{} as {}", value.type_name(), expected)).into()
}

impl TryFrom<HostValue> for bool {
    type Error = JsEngineError;

    fn try_from(value: HostValue) -> Result<Self, Self::Error> {
        match value {
            HostValue::Bool(value) => Ok(value),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl TryFrom<HostValue> for i32 {
    type Error = JsEngineError;

    fn try_from(value: HostValue) -> Result<Self, Self::Error> {
        match value {
            HostValue::Int(value) => Ok(value),
            other => Err(mismatch("i32", &other)),
        }
    }
}

impl TryFrom<HostValue> for f64 {
    type Error = JsEngineError;

    fn try_from(value: HostValue) -> Result<Self, Self::Error> {
        match value.as_f64() {
            Some(number) => Ok(number),
            None => Err(mismatch("f64", &value)),
        }
    }
}

impl TryFrom<HostValue> for String {
    type Error = JsEngineError;

    fn try_from(value: HostValue) -> Result<Self, Self::Error> {
        match value {
            HostValue::String(value) => Ok(value),
            other => Err(mismatch("String", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_integral_numbers_become_int() {
        assert_eq!(HostValue::from_number(36.0), HostValue::Int(36));
        assert_eq!(HostValue::from_number(2.17), HostValue::Double(2.17));
        assert_eq!(HostValue::from_number(4_294_967_296.0), HostValue::Double(4_294_967_296.0));
        assert!(matches!(HostValue::from_number(-0.0), HostValue::Double(_)));
        assert!(matches!(HostValue::from_number(f64::NAN), HostValue::Double(_)));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(i32::try_from(HostValue::Int(16)).unwrap(), 16);
        assert_eq!(f64::try_from(HostValue::Int(16)).unwrap(), 16.0);
        assert_eq!(String::try_from(HostValue::from("abc")).unwrap(), "abc");
        assert!(bool::try_from(HostValue::Bool(true)).unwrap());

        let err = i32::try_from(HostValue::Double(2.5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupportedType);
    }

    #[test]
    fn test_display() {
        assert_eq!(HostValue::Undefined.to_string(), "undefined");
        assert_eq!(HostValue::Double(2.17).to_string(), "2.17");
        assert_eq!(HostValue::from("x").to_string(), "x");
    }
}

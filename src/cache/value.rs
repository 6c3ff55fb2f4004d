//! Cache Value Module
//!
//! The payload stored in an entry. Numeric variants carry their exact width so
//! increments can dispatch on the tag.

use serde::{Deserialize, Serialize};

// == Value ==
/// A stored payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    /// Short name of the stored type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Isize(_) => "isize",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::Usize(_) => "usize",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }

    /// Reason the value cannot survive a JSON round trip, if any.
    ///
    /// JSON has no encoding for NaN or infinities.
    pub(crate) fn unrepresentable_reason(&self) -> Option<String> {
        match self {
            Value::F32(f) if !f.is_finite() => Some(format!("non-finite f32 {}", f)),
            Value::F64(f) if !f.is_finite() => Some(format!("non-finite f64 {}", f)),
            _ => None,
        }
    }
}

// == Conversions ==
macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(7i8), Value::I8(7));
        assert_eq!(Value::from(7usize), Value::Usize(7));
        assert_eq!(Value::from("abc"), Value::Text("abc".to_string()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::from(1u16).type_name(), "u16");
        assert_eq!(Value::from(1.5f32).type_name(), "f32");
        assert_eq!(Value::from(true).type_name(), "bool");
        assert_eq!(Value::from(serde_json::json!({"a": 1})).type_name(), "json");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&Value::from(-3i16)).unwrap();
        assert_eq!(json, r#"{"type":"i16","value":-3}"#);
    }

    #[test]
    fn test_unrepresentable_floats() {
        assert!(Value::F64(f64::NAN).unrepresentable_reason().is_some());
        assert!(Value::F32(f32::INFINITY).unrepresentable_reason().is_some());
        assert!(Value::F64(1.5).unrepresentable_reason().is_none());
    }
}

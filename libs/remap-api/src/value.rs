use std::fmt;
use std::str::FromStr;

use crate::error::MapError;

/// Declared type of a field.
///
/// Textual form (used by shape files and error messages): `bool`, `i32`,
/// `i64`, `u32`, `u64`, `f32`, `f64`, `char`, `string`, `json`, `list<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    /// Arbitrary JSON document.
    Json,
    /// Homogeneous list of the element type.
    List(Box<ValueType>),
}

impl ValueType {
    /// Value a non-nullable field of this type holds before anything is written.
    pub fn zero(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::U32 => Value::U32(0),
            ValueType::U64 => Value::U64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
            ValueType::Char => Value::Char('\0'),
            ValueType::String => Value::String(String::new()),
            ValueType::Json => Value::Json(serde_json::Value::Null),
            ValueType::List(_) => Value::List(Vec::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::I32 => write!(f, "i32"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::U32 => write!(f, "u32"),
            ValueType::U64 => write!(f, "u64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
            ValueType::Char => write!(f, "char"),
            ValueType::String => write!(f, "string"),
            ValueType::Json => write!(f, "json"),
            ValueType::List(elem) => write!(f, "list<{elem}>"),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("list<").and_then(|rest| rest.strip_suffix('>')) {
            return Ok(ValueType::List(Box::new(inner.parse()?)));
        }
        match s {
            "bool" => Ok(ValueType::Bool),
            "i32" => Ok(ValueType::I32),
            "i64" => Ok(ValueType::I64),
            "u32" => Ok(ValueType::U32),
            "u64" => Ok(ValueType::U64),
            "f32" => Ok(ValueType::F32),
            "f64" => Ok(ValueType::F64),
            "char" => Ok(ValueType::Char),
            "string" => Ok(ValueType::String),
            "json" => Ok(ValueType::Json),
            other => Err(format!("unknown value type '{other}'")),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ValueType> for String {
    fn from(ty: ValueType) -> Self {
        ty.to_string()
    }
}

/// Canonical owned value moved between a source field and a target field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Json(serde_json::Value),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Json(_) => "json",
            Value::List(_) => "list",
        }
    }

    /// Type of the value as stored. `None` for `Null`; lists report the type
    /// of their first element (`json` when empty).
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => ValueType::Bool,
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::U32(_) => ValueType::U32,
            Value::U64(_) => ValueType::U64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::Char(_) => ValueType::Char,
            Value::String(_) => ValueType::String,
            Value::Json(_) => ValueType::Json,
            Value::List(items) => ValueType::List(Box::new(
                items
                    .first()
                    .and_then(Value::value_type)
                    .unwrap_or(ValueType::Json),
            )),
        })
    }

    /// Structural JSON encoding. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I32(v) => serde_json::json!(v),
            Value::I64(v) => serde_json::json!(v),
            Value::U32(v) => serde_json::json!(v),
            Value::U64(v) => serde_json::json!(v),
            Value::F32(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::F64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Char(c) => serde_json::Value::String(c.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Json(j) => j.clone(),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    )*};
}

value_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that can live in a mapped field.
///
/// `Option<T>` makes a field nullable; every other implementor is a value
/// type that can never hold `Null`. Reading a `Null` into a non-nullable
/// field yields the type's zero value.
pub trait FieldValue: Sized {
    fn value_type() -> ValueType;

    fn nullable() -> bool {
        false
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, MapError>;
}

macro_rules! copy_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn value_type() -> ValueType {
                ValueType::$variant
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: Value) -> Result<Self, MapError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    Value::Null => Ok(<$ty>::default()),
                    other => Err(MapError::TypeMismatch {
                        expected: ValueType::$variant,
                        found: other.kind().to_string(),
                    }),
                }
            }
        }
    )*};
}

copy_field_value! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
}

impl FieldValue for String {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, MapError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(MapError::TypeMismatch {
                expected: ValueType::String,
                found: other.kind().to_string(),
            }),
        }
    }
}

impl FieldValue for serde_json::Value {
    fn value_type() -> ValueType {
        ValueType::Json
    }

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, MapError> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Null => Ok(serde_json::Value::Null),
            other => Err(MapError::TypeMismatch {
                expected: ValueType::Json,
                found: other.kind().to_string(),
            }),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::List(Box::new(T::value_type()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, MapError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(MapError::TypeMismatch {
                expected: Self::value_type(),
                found: other.kind().to_string(),
            }),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn nullable() -> bool {
        true
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, MapError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_text_form() {
        let ty: ValueType = "list<list<i64>>".parse().unwrap();
        assert_eq!(
            ty,
            ValueType::List(Box::new(ValueType::List(Box::new(ValueType::I64))))
        );
        assert_eq!(ty.to_string(), "list<list<i64>>");
        assert!("decimal".parse::<ValueType>().is_err());
    }

    #[test]
    fn null_reads_as_zero_for_value_types() {
        assert_eq!(i32::from_value(Value::Null).unwrap(), 0);
        assert_eq!(String::from_value(Value::Null).unwrap(), "");
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
    }

    #[test]
    fn wrong_variant_is_a_type_mismatch() {
        let err = i64::from_value(Value::String("7".into())).unwrap_err();
        assert!(matches!(err, MapError::TypeMismatch { expected: ValueType::I64, .. }));
    }

    #[test]
    fn list_value_type_follows_first_element() {
        let list = Value::List(vec![Value::U32(1), Value::U32(2)]);
        assert_eq!(list.value_type(), Some(ValueType::List(Box::new(ValueType::U32))));
        assert_eq!(Value::Null.value_type(), None);
    }
}

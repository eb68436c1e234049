use std::fmt;

use crate::error::MapError;
use crate::value::{Value, ValueType};

/// Type-level value converter, registered on the conversion chain.
///
/// Converters are consulted in registration order only for fields whose
/// source and target types differ; the first one whose `can_convert` accepts
/// the pair performs the conversion. If none applies, generic coercion runs.
/// `convert` is never called with `Value::Null`.
pub trait TypeConverter: Send + Sync {
    fn can_convert(&self, from: &ValueType, to: &ValueType) -> bool;

    fn convert(&self, value: Value, from: &ValueType, to: &ValueType) -> Result<Value, MapError>;
}

/// Field-level converter, referenced by name from a `converter` annotation.
///
/// Runs after type conversion on the value about to be written, including
/// `Null`.
pub trait FieldConverter: Send + Sync {
    fn convert(&self, value: Value) -> Result<Value, MapError>;
}

impl<F> FieldConverter for F
where
    F: Fn(Value) -> Result<Value, MapError> + Send + Sync,
{
    fn convert(&self, value: Value) -> Result<Value, MapError> {
        self(value)
    }
}

/// `TypeConverter` for one exact `(from, to)` pair backed by a closure.
pub struct FnTypeConverter<F> {
    from: ValueType,
    to: ValueType,
    f: F,
}

impl<F> fmt::Debug for FnTypeConverter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTypeConverter")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl<F> FnTypeConverter<F>
where
    F: Fn(Value) -> Result<Value, MapError> + Send + Sync,
{
    pub fn new(from: ValueType, to: ValueType, f: F) -> Self {
        Self { from, to, f }
    }
}

impl<F> TypeConverter for FnTypeConverter<F>
where
    F: Fn(Value) -> Result<Value, MapError> + Send + Sync,
{
    fn can_convert(&self, from: &ValueType, to: &ValueType) -> bool {
        *from == self.from && *to == self.to
    }

    fn convert(&self, value: Value, _from: &ValueType, _to: &ValueType) -> Result<Value, MapError> {
        (self.f)(value)
    }
}

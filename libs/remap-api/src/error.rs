use std::fmt;

use crate::value::ValueType;

/// Error returned by every mapping operation.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// `map` was handed an absent source instance.
    #[error("cannot map an absent source into '{target}'")]
    NullSource { target: String },

    /// Collection mapping was handed an absent source sequence.
    #[error("cannot map an absent source collection into '{target}'")]
    NullCollection { target: String },

    /// No registered converter applied and generic coercion failed.
    #[error("cannot convert {from} to {to}: {reason}")]
    ConversionFailure {
        from: ValueType,
        to: ValueType,
        reason: String,
    },

    /// The target shape could not be instantiated.
    #[error("cannot construct '{shape}': {reason}")]
    TargetConstruction { shape: String, reason: String },

    /// A source field has no counterpart and missing targets are not ignored.
    #[error("source field '{field}' of '{shape}' has no target field")]
    UnmatchedField { shape: String, field: String },

    /// A `converter` annotation names a converter nobody registered.
    #[error("field converter '{0}' is not registered")]
    UnknownConverter(String),

    #[error("shape '{shape}' has no field at index {index}")]
    FieldIndex { shape: String, index: usize },

    /// A value reached a field accessor in the wrong representation.
    #[error("expected {expected} value, found {found}")]
    TypeMismatch { expected: ValueType, found: String },

    /// A custom mapper received or produced a value of an unexpected type.
    #[error("custom mapper for '{source_shape}' -> '{target_shape}' saw a value of another type")]
    CustomMapperType {
        source_shape: String,
        target_shape: String,
    },

    #[error("expected {expected} elements, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Error raised by user code (custom mappers, converters). Passed through
    /// untouched.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl MapError {
    pub fn conversion(from: &ValueType, to: &ValueType, reason: impl fmt::Display) -> Self {
        Self::ConversionFailure {
            from: from.clone(),
            to: to.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn custom(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Custom(err.into())
    }

    pub fn construction(shape: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::TargetConstruction {
            shape: shape.into(),
            reason: reason.to_string(),
        }
    }
}

use std::fmt;
use std::sync::{Arc, RwLock};

use remap_api::coerce::coerce;
use remap_api::converter::TypeConverter;
use remap_api::error::MapError;
use remap_api::value::{Value, ValueType};

use crate::lock;

/// Conversion bound for one `(from, to)` pair.
#[derive(Clone)]
pub enum Conversion {
    /// Types are equal, value is used as-is.
    Identity,
    /// First registered converter accepting the pair.
    Registered(Arc<dyn TypeConverter>),
    /// Generic best-effort coercion.
    Coerce,
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Identity => write!(f, "Identity"),
            Conversion::Registered(_) => write!(f, "Registered"),
            Conversion::Coerce => write!(f, "Coerce"),
        }
    }
}

impl Conversion {
    /// Convert a value. `Null` is returned untouched.
    pub fn apply(&self, value: Value, from: &ValueType, to: &ValueType) -> Result<Value, MapError> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            Conversion::Identity => Ok(value),
            Conversion::Registered(converter) => converter.convert(value, from, to),
            Conversion::Coerce => coerce(value, from, to),
        }
    }
}

/// Append-only, order-preserving list of type converters.
#[derive(Default)]
pub struct ConversionChain {
    converters: RwLock<Vec<Arc<dyn TypeConverter>>>,
}

impl fmt::Debug for ConversionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionChain")
            .field("converters", &self.len())
            .finish()
    }
}

impl ConversionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, converter: Arc<dyn TypeConverter>) {
        lock::write(&self.converters, "type converters").push(converter);
    }

    pub fn len(&self) -> usize {
        lock::read(&self.converters, "type converters").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick the conversion for a pair: identity for equal types, else the
    /// first registered converter that accepts the pair, else coercion.
    pub fn bind(&self, from: &ValueType, to: &ValueType) -> Conversion {
        if from == to {
            return Conversion::Identity;
        }
        lock::read(&self.converters, "type converters")
            .iter()
            .find(|c| c.can_convert(from, to))
            .map(|c| Conversion::Registered(Arc::clone(c)))
            .unwrap_or(Conversion::Coerce)
    }

    pub fn convert(&self, value: Value, from: &ValueType, to: &ValueType) -> Result<Value, MapError> {
        self.bind(from, to).apply(value, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_api::converter::FnTypeConverter;

    fn shout() -> Arc<dyn TypeConverter> {
        Arc::new(FnTypeConverter::new(ValueType::I32, ValueType::String, |v| {
            Ok(Value::String(format!("#{}", match v {
                Value::I32(n) => n,
                _ => 0,
            })))
        }))
    }

    #[test]
    fn first_registered_converter_wins() {
        let chain = ConversionChain::new();
        chain.register(shout());
        chain.register(Arc::new(FnTypeConverter::new(ValueType::I32, ValueType::String, |_| {
            Ok(Value::from("second"))
        })));
        let out = chain.convert(Value::I32(5), &ValueType::I32, &ValueType::String).unwrap();
        assert_eq!(out, Value::from("#5"));
    }

    #[test]
    fn falls_back_to_coercion() {
        let chain = ConversionChain::new();
        chain.register(shout());
        let out = chain.convert(Value::I64(5), &ValueType::I64, &ValueType::String).unwrap();
        assert_eq!(out, Value::from("5"));
    }

    #[test]
    fn equal_types_skip_converters() {
        let chain = ConversionChain::new();
        chain.register(Arc::new(FnTypeConverter::new(ValueType::I32, ValueType::I32, |_| {
            Ok(Value::I32(-1))
        })));
        assert!(matches!(chain.bind(&ValueType::I32, &ValueType::I32), Conversion::Identity));
    }

    #[test]
    fn null_is_not_handed_to_converters() {
        let chain = ConversionChain::new();
        chain.register(shout());
        let out = chain.convert(Value::Null, &ValueType::I32, &ValueType::String).unwrap();
        assert_eq!(out, Value::Null);
    }
}

use std::any::Any;
use std::sync::Arc;

use crate::coerce::coerce;
use crate::error::MapError;
use crate::mappable::Mappable;
use crate::shape::Shape;
use crate::value::{Value, ValueType};

/// Instance of a dynamic shape: positional values, one per shape field.
///
/// Order matches `shape.fields()`. Values always hold the field's declared
/// type, or `Null` for nullable fields.
#[derive(Debug, Clone)]
pub struct Record {
    shape: Arc<Shape>,
    values: Vec<Value>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.shape.id() == other.shape.id() && self.values == other.values
    }
}

impl Record {
    /// Record with every field at its zero value.
    pub fn new(shape: Arc<Shape>) -> Self {
        let values = shape.fields().iter().map(|f| f.zero()).collect();
        Self { shape, values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.shape.field(name).map(|(i, _)| &self.values[i])
    }

    /// Set a field by name, coercing the value to the field's type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), MapError> {
        let (index, field) = self.shape.field(name).ok_or_else(|| MapError::UnmatchedField {
            shape: self.shape.name().to_string(),
            field: name.to_string(),
        })?;
        let value = value.into();
        let from = value.value_type().unwrap_or_else(|| field.value_type.clone());
        let value = coerce(value, &from, &field.value_type)?;
        self.values[index] = if value.is_null() { field.zero() } else { value };
        Ok(())
    }

    /// Build a record from a JSON object. Missing keys and `null` leave the
    /// field at its zero value; other values are coerced to the field type.
    pub fn from_json(shape: Arc<Shape>, json: &serde_json::Value) -> Result<Self, MapError> {
        let object = json.as_object().ok_or_else(|| MapError::TypeMismatch {
            expected: ValueType::Json,
            found: format!("json {}, expected an object", json_kind(json)),
        })?;
        let mut record = Self::new(shape);
        for (index, field) in record.shape.fields().iter().enumerate() {
            let Some(raw) = object.get(&field.name) else {
                continue;
            };
            if raw.is_null() {
                continue;
            }
            record.values[index] = coerce(Value::Json(raw.clone()), &ValueType::Json, &field.value_type)?;
        }
        Ok(record)
    }

    /// JSON object keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .shape
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(field, value)| (field.name.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl Mappable for Record {
    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn read_field(&self, index: usize) -> Result<Value, MapError> {
        self.values.get(index).cloned().ok_or_else(|| MapError::FieldIndex {
            shape: self.shape.name().to_string(),
            index,
        })
    }

    fn write_field(&mut self, index: usize, value: Value) -> Result<(), MapError> {
        let field = self.shape.fields().get(index).ok_or_else(|| MapError::FieldIndex {
            shape: self.shape.name().to_string(),
            index,
        })?;
        self.values[index] = if value.is_null() { field.zero() } else { value };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Field;

    fn person() -> Arc<Shape> {
        Arc::new(
            Shape::builder("Person")
                .field(Field::new("id", ValueType::I64))
                .field(Field::new("name", ValueType::String))
                .field(Field::new("email", ValueType::String).nullable(true))
                .build(),
        )
    }

    #[test]
    fn from_json_coerces_and_defaults() {
        let json = serde_json::json!({"id": "7", "name": "Ada", "extra": true});
        let record = Record::from_json(person(), &json).unwrap();
        assert_eq!(record.get("id"), Some(&Value::I64(7)));
        assert_eq!(record.get("name"), Some(&Value::from("Ada")));
        assert_eq!(record.get("email"), Some(&Value::Null));
    }

    #[test]
    fn to_json_keys_by_field_name() {
        let mut record = Record::new(person());
        record.set("id", 3_i64).unwrap();
        record.set("email", "a@b.c").unwrap();
        assert_eq!(
            record.to_json(),
            serde_json::json!({"id": 3, "name": "", "email": "a@b.c"})
        );
    }

    #[test]
    fn null_into_value_field_writes_zero() {
        let mut record = Record::new(person());
        record.set("name", "x").unwrap();
        record.write_field(1, Value::Null).unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("")));
    }

    #[test]
    fn unknown_index_is_reported() {
        let record = Record::new(person());
        assert!(matches!(record.read_field(9), Err(MapError::FieldIndex { index: 9, .. })));
    }
}

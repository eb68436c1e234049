use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::{FieldValue, Value, ValueType};

/// Stable identity of a shape, used as the cache key for shape pairs.
///
/// - Static shapes (Rust types) are keyed by `TypeId`.
/// - Dynamic shapes get a process-unique number when built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Type(TypeId),
    Dynamic(u64),
}

impl ShapeId {
    pub fn of<T: Any + ?Sized>() -> Self {
        ShapeId::Type(TypeId::of::<T>())
    }

    fn next_dynamic() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ShapeId::Dynamic(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Per-field mapping annotations.
///
/// - `rename`, `skip_if_null`, `converter` are read from the source field.
/// - `default` is read from the target field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotations {
    /// Target field name this source field writes into when no target field
    /// shares its own name.
    pub rename: Option<String>,
    /// Omit the write when the source value is null.
    pub skip_if_null: bool,
    /// Substitute written when the source value is null.
    pub default: Option<Value>,
    /// Name of a registered field converter applied after type conversion.
    pub converter: Option<String>,
}

/// A named, typed slot of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value_type: ValueType,
    /// Only nullable fields can hold `Value::Null`.
    pub nullable: bool,
    pub annotations: FieldAnnotations,
}

impl Field {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable: false,
            annotations: FieldAnnotations::default(),
        }
    }

    /// Field whose type and nullability come from a Rust type.
    pub fn of<T: FieldValue>(name: impl Into<String>) -> Self {
        Self::new(name, T::value_type()).nullable(T::nullable())
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn rename(mut self, target: impl Into<String>) -> Self {
        self.annotations.rename = Some(target.into());
        self
    }

    pub fn skip_if_null(mut self) -> Self {
        self.annotations.skip_if_null = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.annotations.default = Some(value.into());
        self
    }

    pub fn converter(mut self, name: impl Into<String>) -> Self {
        self.annotations.converter = Some(name.into());
        self
    }

    /// Value the field holds before anything is written to it.
    pub fn zero(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            self.value_type.zero()
        }
    }
}

/// Structural descriptor of a source or target kind.
///
/// Field position in `fields` is the index used by `Mappable::read_field` and
/// `Mappable::write_field`. Field names are unique.
#[derive(Clone)]
pub struct Shape {
    id: ShapeId,
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Shape {
    /// Builder for a dynamic shape with a fresh identity.
    pub fn builder(name: impl Into<String>) -> ShapeBuilder {
        ShapeBuilder {
            id: ShapeId::next_dynamic(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder for the shape of a Rust type.
    pub fn builder_for<T: Any>(name: impl Into<String>) -> ShapeBuilder {
        ShapeBuilder {
            id: ShapeId::of::<T>(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name, returning its index as well.
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.index.get(name).map(|&i| (i, &self.fields[i]))
    }
}

#[derive(Debug)]
pub struct ShapeBuilder {
    id: ShapeId,
    name: String,
    fields: Vec<Field>,
}

impl ShapeBuilder {
    /// Append a field. A field with an already used name replaces the earlier
    /// one in place.
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn build(self) -> Shape {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Shape {
            id: self.id,
            name: self.name,
            fields: self.fields,
            index,
        }
    }
}

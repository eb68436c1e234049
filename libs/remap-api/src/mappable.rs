use std::any::Any;

use crate::error::MapError;
use crate::shape::Shape;
use crate::value::Value;

/// An instance the engine can read from and write into.
///
/// Fields are addressed by their index in `shape().fields()`. Usually
/// implemented through `#[derive(Mappable)]`; `Record` implements it for
/// dynamic shapes.
pub trait Mappable: Any + Send + Sync {
    /// Runtime shape of this instance.
    fn shape(&self) -> &Shape;

    fn read_field(&self, index: usize) -> Result<Value, MapError>;

    /// Store an already converted value. `Null` written into a non-nullable
    /// field stores the field's zero value.
    fn write_field(&mut self, index: usize, value: Value) -> Result<(), MapError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A statically shaped type the engine can instantiate as a mapping target.
pub trait MapTarget: Mappable + Sized {
    fn target_shape() -> &'static Shape;

    /// Fresh instance with every field at its zero value.
    fn construct() -> Result<Self, MapError>;
}

/// Borrow anything mappable, sized or not, as a trait object.
pub trait AsMappable {
    fn as_mappable(&self) -> &dyn Mappable;
}

impl<T: Mappable> AsMappable for T {
    fn as_mappable(&self) -> &dyn Mappable {
        self
    }
}

impl AsMappable for dyn Mappable {
    fn as_mappable(&self) -> &dyn Mappable {
        self
    }
}

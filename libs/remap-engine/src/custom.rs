use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use remap_api::error::MapError;
use remap_api::mappable::Mappable;
use remap_api::shape::ShapeId;

use crate::lock;

/// Type-erased custom mapper. The returned box holds the finished target.
pub type CustomMapFn =
    Arc<dyn Fn(&dyn Mappable) -> Result<Box<dyn Any + Send>, MapError> + Send + Sync>;

/// Total per-pair overrides. The last registration for a pair wins.
#[derive(Default)]
pub struct CustomMappers {
    mappers: RwLock<HashMap<(ShapeId, ShapeId), CustomMapFn>>,
}

impl fmt::Debug for CustomMappers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomMappers")
            .field("pairs", &self.len())
            .finish()
    }
}

impl CustomMappers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, source: ShapeId, target: ShapeId, mapper: CustomMapFn) {
        let replaced = lock::write(&self.mappers, "custom mappers")
            .insert((source, target), mapper)
            .is_some();
        if replaced {
            tracing::debug!(?source, ?target, "replaced custom mapper");
        }
    }

    pub fn get(&self, source: ShapeId, target: ShapeId) -> Option<CustomMapFn> {
        lock::read(&self.mappers, "custom mappers")
            .get(&(source, target))
            .cloned()
    }

    pub fn len(&self) -> usize {
        lock::read(&self.mappers, "custom mappers").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(n: i32) -> CustomMapFn {
        Arc::new(move |_: &dyn Mappable| Ok(Box::new(n) as Box<dyn Any + Send>))
    }

    #[test]
    fn last_registration_wins() {
        let mappers = CustomMappers::new();
        let (a, b) = (ShapeId::Dynamic(1), ShapeId::Dynamic(2));
        mappers.register(a, b, constant(1));
        mappers.register(a, b, constant(2));
        assert_eq!(mappers.len(), 1);
        assert!(mappers.get(a, b).is_some());
        assert!(mappers.get(b, a).is_none());
    }
}

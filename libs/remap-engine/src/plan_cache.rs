use std::sync::Arc;

use dashmap::DashMap;

use remap_api::error::MapError;
use remap_api::mapping::MappingPlan;
use remap_api::shape::{Shape, ShapeId};

use crate::resolver;

/// Mapping plans keyed by (source shape, target shape).
///
/// Resolution is pure, so it runs outside any lock: racing first-time callers
/// may each resolve, the first insert is kept and everyone gets that plan.
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: DashMap<(ShapeId, ShapeId), Arc<MappingPlan>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: ShapeId, target: ShapeId) -> Option<Arc<MappingPlan>> {
        self.plans
            .get(&(source, target))
            .map(|plan| Arc::clone(plan.value()))
    }

    pub fn get_or_resolve(&self, source: &Shape, target: &Shape) -> Result<Arc<MappingPlan>, MapError> {
        if let Some(plan) = self.get(source.id(), target.id()) {
            return Ok(plan);
        }

        let plan = Arc::new(resolver::resolve(source, target)?);
        tracing::debug!(
            source = source.name(),
            target = target.name(),
            fields = plan.fields.len(),
            unmatched = plan.unmatched.len(),
            "resolved mapping plan"
        );

        let entry = self
            .plans
            .entry((source.id(), target.id()))
            .or_insert(plan);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_api::shape::Field;
    use remap_api::value::ValueType;

    fn pair() -> (Shape, Shape) {
        let source = Shape::builder("S")
            .field(Field::new("id", ValueType::I64))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("id", ValueType::String))
            .build();
        (source, target)
    }

    #[test]
    fn second_lookup_returns_the_cached_plan() {
        let cache = PlanCache::new();
        let (source, target) = pair();
        let first = cache.get_or_resolve(&source, &target).unwrap();
        let second = cache.get_or_resolve(&source, &target).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_first_requests_converge() {
        let cache = PlanCache::new();
        let (source, target) = pair();
        let plans: Vec<Arc<MappingPlan>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_resolve(&source, &target).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(plans.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn pairs_are_directional() {
        let cache = PlanCache::new();
        let (source, target) = pair();
        cache.get_or_resolve(&source, &target).unwrap();
        cache.get_or_resolve(&target, &source).unwrap();
        assert_eq!(cache.len(), 2);
    }
}

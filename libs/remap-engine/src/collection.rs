use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use remap_api::error::MapError;
use remap_api::mappable::{AsMappable, MapTarget, Mappable};
use remap_api::record::Record;
use remap_api::shape::{Shape, ShapeId};

use crate::engine::{Binding, Mapper, log_timing};
use crate::options::MapOptions;

/// A sequence type that mapped elements can be collected into.
pub trait TargetCollection: Sized {
    type Element: MapTarget;

    fn from_vec(items: Vec<Self::Element>) -> Result<Self, MapError>;
}

impl<T: MapTarget> TargetCollection for Vec<T> {
    type Element = T;

    fn from_vec(items: Vec<T>) -> Result<Self, MapError> {
        Ok(items)
    }
}

impl<T: MapTarget> TargetCollection for VecDeque<T> {
    type Element = T;

    fn from_vec(items: Vec<T>) -> Result<Self, MapError> {
        Ok(items.into())
    }
}

impl<T: MapTarget> TargetCollection for Box<[T]> {
    type Element = T;

    fn from_vec(items: Vec<T>) -> Result<Self, MapError> {
        Ok(items.into_boxed_slice())
    }
}

impl<T: MapTarget, const N: usize> TargetCollection for [T; N] {
    type Element = T;

    fn from_vec(items: Vec<T>) -> Result<Self, MapError> {
        items
            .try_into()
            .map_err(|items: Vec<T>| MapError::LengthMismatch {
                expected: N,
                found: items.len(),
            })
    }
}

impl Mapper {
    /// Map every source into `T`. The first failure discards the batch.
    pub fn map_many<'a, T, S, I>(&self, sources: I, options: &MapOptions) -> Result<Vec<T>, MapError>
    where
        T: MapTarget,
        S: AsMappable + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        self.map_collection(sources, options)
    }

    /// Map every source into the element type of `C` and collect.
    ///
    /// An empty input resolves nothing. The binding for the first element's
    /// shape is reused for following elements of the same shape; an element
    /// of another shape is bound on its own.
    pub fn map_collection<'a, C, S, I>(&self, sources: I, options: &MapOptions) -> Result<C, MapError>
    where
        C: TargetCollection,
        S: AsMappable + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        let target = <C::Element as MapTarget>::target_shape();
        let items = self.map_each(sources, target, <C::Element as MapTarget>::construct, options)?;
        C::from_vec(items)
    }

    /// Like `map_collection`, but an absent sequence fails with
    /// `NullCollection`.
    pub fn map_many_nullable<'a, C, S, I>(
        &self,
        sources: Option<I>,
        options: &MapOptions,
    ) -> Result<C, MapError>
    where
        C: TargetCollection,
        S: AsMappable + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        match sources {
            Some(sources) => self.map_collection(sources, options),
            None => Err(MapError::NullCollection {
                target: <C::Element as MapTarget>::target_shape().name().to_string(),
            }),
        }
    }

    /// Map every source into a record of `target`.
    pub fn map_records<'a, S, I>(
        &self,
        sources: I,
        target: &Arc<Shape>,
        options: &MapOptions,
    ) -> Result<Vec<Record>, MapError>
    where
        S: AsMappable + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        self.map_each(sources, target, || Ok(Record::new(Arc::clone(target))), options)
    }

    fn map_each<'a, T, S, I>(
        &self,
        sources: I,
        target: &Shape,
        construct: impl Fn() -> Result<T, MapError>,
        options: &MapOptions,
    ) -> Result<Vec<T>, MapError>
    where
        T: Mappable,
        S: AsMappable + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        let started = options.timing_diagnostics.then(Instant::now);
        let sources = sources.into_iter();
        let mut items = Vec::with_capacity(sources.size_hint().0);
        let mut bound: Option<(ShapeId, Binding)> = None;
        let mut first_shape: Option<&Shape> = None;

        for source in sources {
            let source = source.as_mappable();
            let shape = source.shape();
            let binding = match &bound {
                Some((id, binding)) if *id == shape.id() => binding,
                previous => {
                    if previous.is_some() {
                        tracing::debug!(
                            source = shape.name(),
                            target = target.name(),
                            "element shape changed, re-resolving"
                        );
                    }
                    &bound.insert((shape.id(), self.bind(shape, target, options)?)).1
                }
            };
            items.push(self.run(binding, source, target, &construct, options)?);
            first_shape.get_or_insert(shape);
        }

        if let (Some(started), Some(source)) = (started, first_shape) {
            log_timing(source, target, items.len(), started);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_api::shape::Field;
    use remap_api::value::{Value, ValueType};

    fn shape(name: &str, id_type: ValueType) -> Arc<Shape> {
        Arc::new(
            Shape::builder(name)
                .field(Field::new("id", id_type))
                .build(),
        )
    }

    #[test]
    fn records_of_mixed_shapes_bind_per_shape() {
        let mapper = Mapper::new();
        let a = shape("A", ValueType::I32);
        let b = shape("B", ValueType::String);
        let target = shape("T", ValueType::I64);

        let mut first = Record::new(Arc::clone(&a));
        first.set("id", 1).unwrap();
        let mut second = Record::new(Arc::clone(&b));
        second.set("id", "2").unwrap();
        let mut third = Record::new(Arc::clone(&a));
        third.set("id", 3).unwrap();

        let out = mapper
            .map_records([&first, &second, &third], &target, &MapOptions::new())
            .unwrap();
        let ids: Vec<_> = out.iter().map(|r| r.get("id").cloned()).collect();
        assert_eq!(
            ids,
            vec![Some(Value::I64(1)), Some(Value::I64(2)), Some(Value::I64(3))]
        );
        assert_eq!(mapper.plan_count(), 2);
    }

    #[test]
    fn empty_input_resolves_nothing() {
        let mapper = Mapper::new();
        let target = shape("T", ValueType::I64);
        let out = mapper
            .map_records(Vec::<&Record>::new(), &target, &MapOptions::new())
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(mapper.plan_count(), 0);
    }

    #[test]
    fn failure_discards_the_batch() {
        let mapper = Mapper::new();
        let source = shape("S", ValueType::String);
        let target = shape("T", ValueType::I64);
        let mut good = Record::new(Arc::clone(&source));
        good.set("id", "7").unwrap();
        let mut bad = Record::new(Arc::clone(&source));
        bad.set("id", "seven").unwrap();

        let err = mapper
            .map_records([&good, &bad], &target, &MapOptions::new())
            .unwrap_err();
        assert!(matches!(err, MapError::ConversionFailure { .. }));
    }
}

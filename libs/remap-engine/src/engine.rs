use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use remap_api::converter::{FieldConverter, TypeConverter};
use remap_api::error::MapError;
use remap_api::mappable::{MapTarget, Mappable};
use remap_api::mapping::MappingPlan;
use remap_api::record::Record;
use remap_api::shape::{Shape, ShapeId};

use crate::compiled::{CompiledCache, CompiledMapper};
use crate::config::EngineConfig;
use crate::convert::{ConversionChain, FieldConverters};
use crate::custom::{CustomMapFn, CustomMappers};
use crate::interpret;
use crate::options::{MapOptions, Strategy};
use crate::plan_cache::PlanCache;

/// How one (source shape, target shape) pair is mapped.
#[derive(Clone)]
pub(crate) enum Binding {
    Custom(CustomMapFn),
    Compiled(Arc<CompiledMapper>),
    Plan(Arc<MappingPlan>),
}

/// Object-to-object mapping engine.
///
/// Owns every cache and registry, so two mappers never share state. A
/// `Mapper` is `Send + Sync`; share it behind an `Arc` to map from several
/// threads.
pub struct Mapper {
    plans: PlanCache,
    compiled: CompiledCache,
    chain: ConversionChain,
    field_converters: FieldConverters,
    custom: CustomMappers,
    /// Bumped on every converter registration; compiled mappers built under
    /// an older value are rebuilt.
    generation: AtomicU64,
    defaults: MapOptions,
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("plans", &self.plans.len())
            .field("compiled", &self.compiled.len())
            .field("chain", &self.chain)
            .field("field_converters", &self.field_converters)
            .field("custom", &self.custom)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::with_defaults(MapOptions::default())
    }
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper whose `map` uses `defaults` instead of `MapOptions::default()`.
    pub fn with_defaults(defaults: MapOptions) -> Self {
        Self {
            plans: PlanCache::new(),
            compiled: CompiledCache::new(),
            chain: ConversionChain::new(),
            field_converters: FieldConverters::new(),
            custom: CustomMappers::new(),
            generation: AtomicU64::new(0),
            defaults,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let defaults = config.defaults.to_options();
        tracing::info!(
            strategy = ?defaults.strategy,
            skip_nulls = defaults.skip_nulls,
            shapes = config.shapes.len(),
            "mapper configured"
        );
        Self::with_defaults(defaults)
    }

    pub fn defaults(&self) -> &MapOptions {
        &self.defaults
    }

    // ── Registration ──

    /// Append a type converter. Earlier registrations take precedence for
    /// pairs both accept.
    pub fn register_type_converter(&self, converter: impl TypeConverter + 'static) {
        self.chain.register(Arc::new(converter));
        let generation = self.bump_generation();
        tracing::debug!(converters = self.chain.len(), generation, "registered type converter");
    }

    /// Register a converter referenced by `converter = "<name>"` field
    /// annotations. Re-registering a name replaces the converter.
    pub fn register_field_converter(
        &self,
        name: impl Into<String>,
        converter: impl FieldConverter + 'static,
    ) {
        let name = name.into();
        self.field_converters.register(name.clone(), Arc::new(converter));
        let generation = self.bump_generation();
        tracing::debug!(converter = %name, generation, "registered field converter");
    }

    /// Replace the whole pipeline for `S -> T` with `f`.
    pub fn register_custom_mapper<S, T, F>(&self, f: F)
    where
        S: MapTarget,
        T: MapTarget,
        F: Fn(&S) -> Result<T, MapError> + Send + Sync + 'static,
    {
        let source_name = S::target_shape().name().to_string();
        let target_name = T::target_shape().name().to_string();
        let erased: CustomMapFn = Arc::new(move |source: &dyn Mappable| {
            let source = source.as_any().downcast_ref::<S>().ok_or_else(|| {
                MapError::CustomMapperType {
                    source_shape: source_name.clone(),
                    target_shape: target_name.clone(),
                }
            })?;
            Ok(Box::new(f(source)?) as Box<dyn Any + Send>)
        });
        self.custom
            .register(S::target_shape().id(), T::target_shape().id(), erased);
    }

    /// Custom mapper keyed by shape identity, for dynamic shapes.
    ///
    /// `R` must be the type the target is requested as (`Record` for
    /// `map_record`), otherwise the map fails with `CustomMapperType`.
    pub fn register_custom_mapper_dyn<R, F>(&self, source: ShapeId, target: ShapeId, f: F)
    where
        R: Mappable,
        F: Fn(&dyn Mappable) -> Result<R, MapError> + Send + Sync + 'static,
    {
        let erased: CustomMapFn = Arc::new(move |source: &dyn Mappable| {
            Ok(Box::new(f(source)?) as Box<dyn Any + Send>)
        });
        self.custom.register(source, target, erased);
    }

    // ── Introspection ──

    /// Cached plan for a shape pair, resolving it on first use.
    pub fn plan(&self, source: &Shape, target: &Shape) -> Result<Arc<MappingPlan>, MapError> {
        self.plans.get_or_resolve(source, target)
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    // ── Mapping ──

    /// Map with the mapper's default options.
    pub fn map<T: MapTarget>(&self, source: &dyn Mappable) -> Result<T, MapError> {
        self.map_with(source, &self.defaults)
    }

    pub fn map_with<T: MapTarget>(
        &self,
        source: &dyn Mappable,
        options: &MapOptions,
    ) -> Result<T, MapError> {
        let started = options.timing_diagnostics.then(Instant::now);
        let target_shape = T::target_shape();
        let binding = self.bind(source.shape(), target_shape, options)?;
        let result = self.run(&binding, source, target_shape, T::construct, options);
        if let Some(started) = started {
            log_timing(source.shape(), target_shape, 1, started);
        }
        result
    }

    /// Like `map_with`, but an absent source fails with `NullSource`.
    pub fn map_nullable<T: MapTarget>(
        &self,
        source: Option<&dyn Mappable>,
        options: &MapOptions,
    ) -> Result<T, MapError> {
        match source {
            Some(source) => self.map_with(source, options),
            None => Err(MapError::NullSource {
                target: T::target_shape().name().to_string(),
            }),
        }
    }

    /// Map into a dynamic record of `target`.
    pub fn map_record(
        &self,
        source: &dyn Mappable,
        target: &Arc<Shape>,
        options: &MapOptions,
    ) -> Result<Record, MapError> {
        let started = options.timing_diagnostics.then(Instant::now);
        let binding = self.bind(source.shape(), target, options)?;
        let result = self.run(
            &binding,
            source,
            target,
            || Ok(Record::new(Arc::clone(target))),
            options,
        );
        if let Some(started) = started {
            log_timing(source.shape(), target, 1, started);
        }
        result
    }

    // ── Internals ──

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Pick how a pair is mapped: a custom mapper if one is registered,
    /// otherwise the cached plan run by the requested strategy.
    pub(crate) fn bind(
        &self,
        source: &Shape,
        target: &Shape,
        options: &MapOptions,
    ) -> Result<Binding, MapError> {
        if let Some(custom) = self.custom.get(source.id(), target.id()) {
            return Ok(Binding::Custom(custom));
        }

        let plan = self.plans.get_or_resolve(source, target)?;
        if !options.ignore_missing_target {
            if let Some(field) = plan.unmatched.first() {
                return Err(MapError::UnmatchedField {
                    shape: plan.source_name.clone(),
                    field: field.clone(),
                });
            }
        }

        match options.strategy {
            Strategy::Interpreted => Ok(Binding::Plan(plan)),
            Strategy::Compiled => {
                let generation = self.generation.load(Ordering::Acquire);
                let compiled = self
                    .compiled
                    .get_or_compile((source.id(), target.id()), generation, || {
                        CompiledMapper::compile(
                            Arc::clone(&plan),
                            &self.chain,
                            &self.field_converters,
                            generation,
                        )
                    })?;
                Ok(Binding::Compiled(compiled))
            }
        }
    }

    /// Produce one target through a binding, then run post-configure.
    pub(crate) fn run<T: Mappable>(
        &self,
        binding: &Binding,
        source: &dyn Mappable,
        target_shape: &Shape,
        construct: impl FnOnce() -> Result<T, MapError>,
        options: &MapOptions,
    ) -> Result<T, MapError> {
        let mut target = match binding {
            Binding::Custom(f) => {
                let produced = f(source)?;
                *produced
                    .downcast::<T>()
                    .map_err(|_| MapError::CustomMapperType {
                        source_shape: source.shape().name().to_string(),
                        target_shape: target_shape.name().to_string(),
                    })?
            }
            Binding::Compiled(mapper) => {
                let mut target = construct()?;
                mapper.apply(source, &mut target, options)?;
                target
            }
            Binding::Plan(plan) => {
                let mut target = construct()?;
                interpret::apply_plan(
                    plan,
                    source,
                    &mut target,
                    &self.chain,
                    &self.field_converters,
                    options,
                )?;
                target
            }
        };

        if let Some(post) = &options.post_configure {
            post(&mut target);
        }
        Ok(target)
    }
}

pub(crate) fn log_timing(source: &Shape, target: &Shape, count: usize, started: Instant) {
    tracing::debug!(
        source = source.name(),
        target = target.name(),
        count,
        elapsed_us = started.elapsed().as_micros() as u64,
        "mapped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_api::shape::Field;
    use remap_api::value::{Value, ValueType};

    fn shapes() -> (Arc<Shape>, Arc<Shape>) {
        let source = Shape::builder("Src")
            .field(Field::new("id", ValueType::I32))
            .field(Field::new("extra", ValueType::String))
            .build();
        let target = Shape::builder("Dst")
            .field(Field::new("id", ValueType::I64))
            .build();
        (Arc::new(source), Arc::new(target))
    }

    #[test]
    fn strategy_selects_binding() {
        let mapper = Mapper::new();
        let (source, target) = shapes();

        let opts = MapOptions::new().with_strategy(Strategy::Interpreted);
        assert!(matches!(mapper.bind(&source, &target, &opts), Ok(Binding::Plan(_))));
        assert_eq!(mapper.compiled_count(), 0);

        let opts = MapOptions::new();
        assert!(matches!(mapper.bind(&source, &target, &opts), Ok(Binding::Compiled(_))));
        assert_eq!(mapper.compiled_count(), 1);
        assert_eq!(mapper.plan_count(), 1);
    }

    #[test]
    fn unmatched_field_is_an_error_on_request() {
        let mapper = Mapper::new();
        let (source, target) = shapes();
        let mut input = Record::new(Arc::clone(&source));
        input.set("id", 3).unwrap();

        let out = mapper.map_record(&input, &target, &MapOptions::new()).unwrap();
        assert_eq!(out.get("id"), Some(&Value::I64(3)));

        let strict = MapOptions::new().with_ignore_missing_target(false);
        let err = mapper.map_record(&input, &target, &strict).unwrap_err();
        assert!(matches!(err, MapError::UnmatchedField { field, .. } if field == "extra"));
    }

    #[test]
    fn converter_registration_rebuilds_compiled_mapper() {
        let mapper = Mapper::new();
        let (source, target) = shapes();
        let opts = MapOptions::new();
        let Ok(Binding::Compiled(before)) = mapper.bind(&source, &target, &opts) else {
            panic!("expected compiled binding");
        };
        mapper.register_field_converter("noop", |v: Value| -> Result<Value, MapError> { Ok(v) });
        let Ok(Binding::Compiled(after)) = mapper.bind(&source, &target, &opts) else {
            panic!("expected compiled binding");
        };
        assert!(after.generation() > before.generation());
        assert_eq!(mapper.compiled_count(), 1);
    }

    #[test]
    fn custom_dyn_mapper_bypasses_plan() {
        let mapper = Mapper::new();
        let (source, target) = shapes();
        mapper.register_custom_mapper_dyn(source.id(), target.id(), |_| {
            Ok(Record::new(Arc::new(Shape::builder("Other").build())))
        });
        let input = Record::new(Arc::clone(&source));
        let out = mapper.map_record(&input, &target, &MapOptions::new()).unwrap();
        assert_eq!(out.shape().name(), "Other");
        assert_eq!(mapper.plan_count(), 0);
    }

    #[test]
    fn mapper_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mapper>();
    }
}

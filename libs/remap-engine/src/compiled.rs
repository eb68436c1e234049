use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use remap_api::converter::FieldConverter;
use remap_api::error::MapError;
use remap_api::mappable::Mappable;
use remap_api::mapping::{FieldMapping, MappingPlan};
use remap_api::shape::ShapeId;
use remap_api::value::Value;

use crate::convert::{Conversion, ConversionChain, FieldConverters};
use crate::options::MapOptions;

type FieldStep =
    Box<dyn Fn(&dyn Mappable, &mut dyn Mappable, &MapOptions) -> Result<(), MapError> + Send + Sync>;

/// Mapping function specialized for one shape pair.
///
/// Every field step has its indices, conversion, field converter and default
/// bound at build time, so a call does no registry or plan lookups. Only
/// steps reading a nullable source field carry a null guard.
pub struct CompiledMapper {
    plan: Arc<MappingPlan>,
    generation: u64,
    steps: Vec<FieldStep>,
}

impl fmt::Debug for CompiledMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMapper")
            .field("source", &self.plan.source_name)
            .field("target", &self.plan.target_name)
            .field("generation", &self.generation)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl CompiledMapper {
    /// Build from a plan with the converters registered right now.
    ///
    /// Fails with `UnknownConverter` if a `converter` annotation names a
    /// converter that is not registered.
    pub fn compile(
        plan: Arc<MappingPlan>,
        chain: &ConversionChain,
        field_converters: &FieldConverters,
        generation: u64,
    ) -> Result<Self, MapError> {
        let steps = plan
            .fields
            .iter()
            .map(|mapping| compile_step(mapping, chain, field_converters))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            plan,
            generation,
            steps,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn apply(
        &self,
        source: &dyn Mappable,
        target: &mut dyn Mappable,
        options: &MapOptions,
    ) -> Result<(), MapError> {
        for step in &self.steps {
            step(source, target, options)?;
        }
        Ok(())
    }
}

fn compile_step(
    mapping: &FieldMapping,
    chain: &ConversionChain,
    field_converters: &FieldConverters,
) -> Result<FieldStep, MapError> {
    let source_index = mapping.source_index;
    let target_index = mapping.target_index;
    let from = mapping.source.value_type.clone();
    let to = mapping.target.value_type.clone();
    let conversion = if mapping.needs_conversion() {
        chain.bind(&from, &to)
    } else {
        Conversion::Identity
    };
    let post: Option<Arc<dyn FieldConverter>> = match &mapping.source.annotations.converter {
        Some(name) => Some(field_converters.get(name)?),
        None => None,
    };

    let convert = move |value: Value| -> Result<Value, MapError> {
        let value = conversion.apply(value, &from, &to)?;
        match &post {
            Some(converter) => converter.convert(value),
            None => Ok(value),
        }
    };

    if !mapping.source.nullable {
        return Ok(Box::new(
            move |source: &dyn Mappable, target: &mut dyn Mappable, _options: &MapOptions| {
                let value = source.read_field(source_index)?;
                target.write_field(target_index, convert(value)?)
            },
        ));
    }

    let skip_if_null = mapping.source.annotations.skip_if_null;
    let default = mapping.default.clone();
    Ok(Box::new(
        move |source: &dyn Mappable, target: &mut dyn Mappable, options: &MapOptions| {
            let value = source.read_field(source_index)?;
            if value.is_null() {
                if skip_if_null || options.skip_nulls {
                    return Ok(());
                }
                if let Some(default) = &default {
                    return target.write_field(target_index, default.clone());
                }
            }
            target.write_field(target_index, convert(value)?)
        },
    ))
}

/// Compiled mappers keyed by shape pair.
///
/// Each entry remembers the converter-registry generation it was built
/// under; an entry from an older generation is rebuilt on next use.
#[derive(Debug, Default)]
pub struct CompiledCache {
    mappers: DashMap<(ShapeId, ShapeId), Arc<CompiledMapper>>,
}

impl CompiledCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &self,
        key: (ShapeId, ShapeId),
        generation: u64,
        build: impl FnOnce() -> Result<CompiledMapper, MapError>,
    ) -> Result<Arc<CompiledMapper>, MapError> {
        if let Some(mapper) = self.mappers.get(&key) {
            if mapper.generation >= generation {
                return Ok(Arc::clone(mapper.value()));
            }
        }

        let compiled = Arc::new(build()?);
        tracing::debug!(
            source = compiled.plan.source_name.as_str(),
            target = compiled.plan.target_name.as_str(),
            generation,
            steps = compiled.steps.len(),
            "compiled mapper"
        );

        let mut entry = self
            .mappers
            .entry(key)
            .or_insert_with(|| Arc::clone(&compiled));
        if entry.generation < generation {
            *entry = compiled;
        }
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

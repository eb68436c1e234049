use remap_api::error::MapError;
use remap_api::mappable::Mappable;
use remap_api::mapping::MappingPlan;

use crate::convert::{ConversionChain, FieldConverters};
use crate::options::MapOptions;
use crate::policy::{self, NullAction};

/// Apply a plan field by field, binding converters on every call.
///
/// Every named field converter is looked up before any field is written, so
/// an unregistered name fails the map whether or not a value reaches it.
pub(crate) fn apply_plan(
    plan: &MappingPlan,
    source: &dyn Mappable,
    target: &mut dyn Mappable,
    chain: &ConversionChain,
    field_converters: &FieldConverters,
    options: &MapOptions,
) -> Result<(), MapError> {
    let post = plan
        .fields
        .iter()
        .map(|mapping| {
            mapping
                .source
                .annotations
                .converter
                .as_deref()
                .map(|name| field_converters.get(name))
                .transpose()
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (mapping, post) in plan.fields.iter().zip(&post) {
        let value = source.read_field(mapping.source_index)?;
        let value = match policy::evaluate(value, mapping, options) {
            NullAction::Skip => continue,
            NullAction::Write(default) => default,
            NullAction::Convert(value) => {
                let value = chain.convert(value, &mapping.source.value_type, &mapping.target.value_type)?;
                match post {
                    Some(converter) => converter.convert(value)?,
                    None => value,
                }
            }
        };
        target.write_field(mapping.target_index, value)?;
    }
    Ok(())
}

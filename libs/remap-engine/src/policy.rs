use remap_api::mapping::FieldMapping;
use remap_api::value::Value;

use crate::options::MapOptions;

/// What to do with a source value before conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum NullAction {
    /// Leave the target field untouched.
    Skip,
    /// Write this value as-is (a default already in the target type).
    Write(Value),
    /// Run the value through the conversion chain.
    Convert(Value),
}

/// Null and default precedence, first match wins:
/// 1. null and the source field is `skip_if_null` → skip;
/// 2. null and `options.skip_nulls` → skip;
/// 3. null and the target field has a default → write the default;
/// 4. otherwise convert (null included).
pub fn evaluate(value: Value, mapping: &FieldMapping, options: &MapOptions) -> NullAction {
    if !value.is_null() {
        return NullAction::Convert(value);
    }
    if mapping.source.annotations.skip_if_null || options.skip_nulls {
        return NullAction::Skip;
    }
    match &mapping.default {
        Some(default) => NullAction::Write(default.clone()),
        None => NullAction::Convert(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_api::shape::Field;
    use remap_api::value::ValueType;

    fn mapping(skip_if_null: bool, default: Option<Value>) -> FieldMapping {
        let mut source = Field::new("v", ValueType::String).nullable(true);
        source.annotations.skip_if_null = skip_if_null;
        FieldMapping {
            source_index: 0,
            target_index: 0,
            source,
            target: Field::new("v", ValueType::String),
            default,
        }
    }

    #[test]
    fn skip_if_null_beats_everything() {
        let m = mapping(true, Some(Value::from("d")));
        let opts = MapOptions::default().with_skip_nulls(true);
        assert_eq!(evaluate(Value::Null, &m, &opts), NullAction::Skip);
        assert_eq!(evaluate(Value::Null, &m, &MapOptions::default()), NullAction::Skip);
    }

    #[test]
    fn global_skip_beats_default() {
        let m = mapping(false, Some(Value::from("d")));
        let opts = MapOptions::default().with_skip_nulls(true);
        assert_eq!(evaluate(Value::Null, &m, &opts), NullAction::Skip);
    }

    #[test]
    fn default_beats_plain_conversion() {
        let m = mapping(false, Some(Value::from("d")));
        assert_eq!(
            evaluate(Value::Null, &m, &MapOptions::default()),
            NullAction::Write(Value::from("d"))
        );
        let m = mapping(false, None);
        assert_eq!(
            evaluate(Value::Null, &m, &MapOptions::default()),
            NullAction::Convert(Value::Null)
        );
    }

    #[test]
    fn present_values_always_convert() {
        let m = mapping(true, Some(Value::from("d")));
        let opts = MapOptions::default().with_skip_nulls(true);
        assert_eq!(
            evaluate(Value::from("x"), &m, &opts),
            NullAction::Convert(Value::from("x"))
        );
    }
}

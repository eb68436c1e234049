use remap_api::coerce::coerce;
use remap_api::error::MapError;
use remap_api::mapping::{FieldMapping, MappingPlan};
use remap_api::shape::Shape;

/// Compute the field correspondences for a shape pair.
///
/// For every source field, in declaration order:
/// 1. the target field named by the source field's `rename`, if present;
/// 2. otherwise a target field with the same name;
/// 3. otherwise the field is recorded in `unmatched`.
///
/// An explicit rename always wins over a same-named target field. Target-side
/// renames are never consulted. The target field's `default` is
/// coerced to the target type here, once per pair.
pub fn resolve(source: &Shape, target: &Shape) -> Result<MappingPlan, MapError> {
    let mut fields = Vec::new();
    let mut unmatched = Vec::new();

    for (source_index, source_field) in source.fields().iter().enumerate() {
        let found = source_field
            .annotations
            .rename
            .as_deref()
            .and_then(|renamed| target.field(renamed))
            .or_else(|| target.field(&source_field.name));

        let Some((target_index, target_field)) = found else {
            unmatched.push(source_field.name.clone());
            continue;
        };

        let default = match &target_field.annotations.default {
            Some(value) => {
                let from = value
                    .value_type()
                    .unwrap_or_else(|| target_field.value_type.clone());
                Some(coerce(value.clone(), &from, &target_field.value_type)?)
            }
            None => None,
        };

        fields.push(FieldMapping {
            source_index,
            target_index,
            source: source_field.clone(),
            target: target_field.clone(),
            default,
        });
    }

    Ok(MappingPlan {
        source: source.id(),
        target: target.id(),
        source_name: source.name().to_string(),
        target_name: target.name().to_string(),
        fields,
        unmatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_api::shape::Field;
    use remap_api::value::{Value, ValueType};

    #[test]
    fn rename_wins_over_same_name() {
        let source = Shape::builder("S")
            .field(Field::new("a", ValueType::I32).rename("b"))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("a", ValueType::String))
            .field(Field::new("b", ValueType::I64))
            .build();
        let plan = resolve(&source, &target).unwrap();
        assert_eq!(plan.fields.len(), 1);
        assert_eq!(plan.fields[0].target_index, 1);
        assert!(plan.fields[0].is_renamed());
    }

    #[test]
    fn rename_to_missing_field_falls_back_to_name() {
        let source = Shape::builder("S")
            .field(Field::new("a", ValueType::I32).rename("gone"))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("a", ValueType::I32))
            .build();
        let plan = resolve(&source, &target).unwrap();
        assert_eq!(plan.fields[0].target.name, "a");
        assert!(plan.unmatched.is_empty());
    }

    #[test]
    fn rename_redirects_when_name_is_missing() {
        let source = Shape::builder("S")
            .field(Field::new("full_name", ValueType::String).rename("name"))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("name", ValueType::String))
            .build();
        let plan = resolve(&source, &target).unwrap();
        assert_eq!(plan.fields[0].target.name, "name");
        assert!(plan.fields[0].is_renamed());
    }

    #[test]
    fn target_side_rename_is_ignored() {
        let source = Shape::builder("S")
            .field(Field::new("x", ValueType::I32))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("y", ValueType::I32).rename("x"))
            .build();
        let plan = resolve(&source, &target).unwrap();
        assert!(plan.fields.is_empty());
        assert_eq!(plan.unmatched, vec!["x".to_string()]);
    }

    #[test]
    fn default_is_coerced_to_target_type() {
        let source = Shape::builder("S")
            .field(Field::new("n", ValueType::I32).nullable(true))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("n", ValueType::U64).default_value(Value::I64(9)))
            .build();
        let plan = resolve(&source, &target).unwrap();
        assert_eq!(plan.fields[0].default, Some(Value::U64(9)));
    }

    #[test]
    fn default_that_cannot_be_coerced_fails() {
        let source = Shape::builder("S")
            .field(Field::new("n", ValueType::I32))
            .build();
        let target = Shape::builder("T")
            .field(Field::new("n", ValueType::I32).default_value("many"))
            .build();
        assert!(matches!(
            resolve(&source, &target),
            Err(MapError::ConversionFailure { .. })
        ));
    }
}

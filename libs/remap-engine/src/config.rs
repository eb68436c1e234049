use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use remap_api::coerce::coerce;
use remap_api::shape::{Field, Shape};
use remap_api::value::{Value, ValueType};

use crate::error::EngineError;
use crate::options::{MapOptions, Strategy};

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Options used by `Mapper::map` and the CLI.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Dynamic shape definitions.
    #[serde(default)]
    pub shapes: Vec<ShapeConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub skip_nulls: bool,
    #[serde(default = "default_ignore_missing_target")]
    pub ignore_missing_target: bool,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub timing_diagnostics: bool,
}

fn default_ignore_missing_target() -> bool {
    true
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            skip_nulls: false,
            ignore_missing_target: default_ignore_missing_target(),
            strategy: Strategy::default(),
            timing_diagnostics: false,
        }
    }
}

impl DefaultsConfig {
    pub fn to_options(&self) -> MapOptions {
        MapOptions::new()
            .with_skip_nulls(self.skip_nulls)
            .with_ignore_missing_target(self.ignore_missing_target)
            .with_strategy(self.strategy)
            .with_timing_diagnostics(self.timing_diagnostics)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeConfig {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// `bool`, `i32`, ..., `string`, `json` or `list<T>`.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub skip_if_null: bool,
    /// Written when the source value is null; coerced to `type`.
    #[serde(default)]
    pub default: Option<toml::Value>,
    #[serde(default)]
    pub converter: Option<String>,
}

impl FieldConfig {
    fn to_field(&self) -> Result<Field, EngineError> {
        let mut field = Field::new(&self.name, self.value_type.clone()).nullable(self.nullable);
        field.annotations.rename = self.rename.clone();
        field.annotations.skip_if_null = self.skip_if_null;
        field.annotations.converter = self.converter.clone();
        if let Some(default) = &self.default {
            field.annotations.default = Some(self.default_value(default)?);
        }
        Ok(field)
    }

    fn default_value(&self, raw: &toml::Value) -> Result<Value, EngineError> {
        let json = serde_json::to_value(raw)
            .map_err(|e| EngineError::Config(format!("default of '{}': {e}", self.name)))?;
        coerce(Value::Json(json), &ValueType::Json, &self.value_type)
            .map_err(|e| EngineError::Config(format!("default of '{}': {e}", self.name)))
    }
}

impl ShapeConfig {
    fn to_shape(&self) -> Result<Shape, EngineError> {
        let mut builder = Shape::builder(&self.name);
        for field in &self.fields {
            let field = field
                .to_field()
                .map_err(|e| e.with_context(format!("shape '{}'", self.name)))?;
            builder = builder.field(field);
        }
        Ok(builder.build())
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let mut shape_names = HashSet::new();
        for shape in &self.shapes {
            if !shape_names.insert(shape.name.as_str()) {
                return Err(EngineError::Config(format!("duplicate shape '{}'", shape.name)));
            }
            let mut field_names = HashSet::new();
            for field in &shape.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(EngineError::Config(format!(
                        "shape '{}': duplicate field '{}'",
                        shape.name, field.name
                    )));
                }
            }
            shape.to_shape()?;
        }
        Ok(())
    }

    /// Build every configured shape. Each call produces fresh shape
    /// identities, so build the catalog once and reuse it.
    pub fn shapes(&self) -> Result<ShapeCatalog, EngineError> {
        let mut shapes = HashMap::with_capacity(self.shapes.len());
        for config in &self.shapes {
            let shape = Arc::new(config.to_shape()?);
            tracing::debug!(shape = %config.name, fields = shape.len(), "built shape");
            shapes.insert(config.name.clone(), shape);
        }
        Ok(ShapeCatalog { shapes })
    }
}

/// Configured shapes by name.
#[derive(Debug, Clone, Default)]
pub struct ShapeCatalog {
    shapes: HashMap<String, Arc<Shape>>,
}

impl ShapeCatalog {
    pub fn get(&self, name: &str) -> Option<&Arc<Shape>> {
        self.shapes.get(name)
    }

    /// Like `get`, but an unknown name is a config error.
    pub fn require(&self, name: &str) -> Result<&Arc<Shape>, EngineError> {
        self.get(name).ok_or_else(|| {
            let mut known: Vec<_> = self.names().collect();
            known.sort_unstable();
            EngineError::Config(format!(
                "unknown shape '{name}' (known: {})",
                known.join(", ")
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
        [defaults]
        skip_nulls = true
        strategy = "interpreted"

        [[shapes]]
        name = "Row"

        [[shapes.fields]]
        name = "id"
        type = "i64"

        [[shapes.fields]]
        name = "tags"
        type = "list<string>"
        nullable = true
        rename = "labels"

        [[shapes]]
        name = "Out"

        [[shapes.fields]]
        name = "id"
        type = "string"
        default = 0
        converter = "upper"
    "#;

    #[test]
    fn parses_defaults_and_shapes() {
        let config = EngineConfig::parse(CONFIG).unwrap();
        assert_eq!(
            config.defaults,
            DefaultsConfig {
                skip_nulls: true,
                ignore_missing_target: true,
                strategy: Strategy::Interpreted,
                timing_diagnostics: false,
            }
        );

        let catalog = config.shapes().unwrap();
        assert_eq!(catalog.len(), 2);
        let row = catalog.require("Row").unwrap();
        let (_, tags) = row.field("tags").unwrap();
        assert_eq!(tags.value_type, ValueType::List(Box::new(ValueType::String)));
        assert!(tags.nullable);
        assert_eq!(tags.annotations.rename.as_deref(), Some("labels"));

        let out = catalog.require("Out").unwrap();
        let (_, id) = out.field("id").unwrap();
        assert_eq!(id.annotations.default, Some(Value::from("0")));
        assert_eq!(id.annotations.converter.as_deref(), Some("upper"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config.defaults, DefaultsConfig::default());
        assert!(config.shapes().unwrap().is_empty());
    }

    #[test]
    fn rejects_duplicates() {
        let dup_shape = r#"
            [[shapes]]
            name = "A"
            [[shapes]]
            name = "A"
        "#;
        let err = EngineConfig::parse(dup_shape).unwrap_err();
        assert!(err.to_string().contains("duplicate shape 'A'"), "{err}");

        let dup_field = r#"
            [[shapes]]
            name = "A"
            [[shapes.fields]]
            name = "x"
            type = "i32"
            [[shapes.fields]]
            name = "x"
            type = "i64"
        "#;
        let err = EngineConfig::parse(dup_field).unwrap_err();
        assert!(err.to_string().contains("duplicate field 'x'"), "{err}");
    }

    #[test]
    fn rejects_unknown_type_and_bad_default() {
        let unknown = r#"
            [[shapes]]
            name = "A"
            [[shapes.fields]]
            name = "x"
            type = "decimal"
        "#;
        assert!(matches!(EngineConfig::parse(unknown), Err(EngineError::Config(_))));

        let bad_default = r#"
            [[shapes]]
            name = "A"
            [[shapes.fields]]
            name = "x"
            type = "u32"
            default = -1
        "#;
        let err = EngineConfig::parse(bad_default).unwrap_err();
        assert!(err.to_string().contains("shape 'A'"), "{err}");
    }

    #[test]
    fn unknown_shape_lookup_fails() {
        let catalog = EngineConfig::parse(CONFIG).unwrap().shapes().unwrap();
        assert!(catalog.get("Missing").is_none());
        let err = catalog.require("Missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "config error: unknown shape 'Missing' (known: Out, Row)"
        );
    }
}

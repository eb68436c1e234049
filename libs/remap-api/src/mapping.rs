use crate::shape::{Field, ShapeId};
use crate::value::Value;

/// One resolved source → target field correspondence.
///
/// Either both fields share a name, or the source field's `rename`
/// annotation names the target field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    /// Position in the source shape.
    pub source_index: usize,
    /// Position in the target shape.
    pub target_index: usize,
    pub source: Field,
    pub target: Field,
    /// Target field's default, already coerced to the target type.
    pub default: Option<Value>,
}

impl FieldMapping {
    /// Source and target types differ, so the conversion chain is involved.
    pub fn needs_conversion(&self) -> bool {
        self.source.value_type != self.target.value_type
    }

    pub fn is_renamed(&self) -> bool {
        self.source.name != self.target.name
    }
}

/// Ordered field correspondences for one (source shape, target shape) pair.
///
/// Computed once per pair and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingPlan {
    pub source: ShapeId,
    pub target: ShapeId,
    /// Shape names, for diagnostics.
    pub source_name: String,
    pub target_name: String,
    /// Source declaration order.
    pub fields: Vec<FieldMapping>,
    /// Source fields with no target counterpart.
    pub unmatched: Vec<String>,
}

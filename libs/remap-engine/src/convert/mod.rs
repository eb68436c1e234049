//! Value conversion chain.
//!
//! - `chain`: registered type converters plus the generic coercion fallback.
//! - `field`: named field converters referenced by `converter` annotations.

pub mod chain;
pub mod field;

pub use chain::{Conversion, ConversionChain};
pub use field::FieldConverters;

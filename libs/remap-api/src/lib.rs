pub mod coerce;
pub mod converter;

pub use remap_api_derive::Mappable;
pub mod error;
pub mod mappable;
pub mod mapping;
pub mod record;
pub mod shape;
pub mod value;

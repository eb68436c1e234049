pub mod collection;
pub mod compiled;
pub mod config;
pub mod convert;
pub mod custom;
mod engine;
pub mod error;
mod interpret;
mod lock;
pub mod options;
pub mod plan_cache;
pub mod policy;
pub mod resolver;

pub use collection::TargetCollection;
pub use config::{EngineConfig, ShapeCatalog};
pub use engine::Mapper;
pub use error::EngineError;
pub use options::{MapOptions, Strategy};

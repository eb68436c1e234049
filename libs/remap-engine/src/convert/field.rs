use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use remap_api::converter::FieldConverter;
use remap_api::error::MapError;

use crate::lock;

/// Field converters by name. Registering an existing name replaces it.
#[derive(Default)]
pub struct FieldConverters {
    converters: RwLock<HashMap<String, Arc<dyn FieldConverter>>>,
}

impl fmt::Debug for FieldConverters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = lock::read(&self.converters, "field converters")
            .keys()
            .cloned()
            .collect();
        f.debug_struct("FieldConverters").field("names", &names).finish()
    }
}

impl FieldConverters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, converter: Arc<dyn FieldConverter>) {
        lock::write(&self.converters, "field converters").insert(name.into(), converter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn FieldConverter>, MapError> {
        lock::read(&self.converters, "field converters")
            .get(name)
            .cloned()
            .ok_or_else(|| MapError::UnknownConverter(name.to_string()))
    }
}

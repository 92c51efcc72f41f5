use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::lock;
use crate::{Error, NativeObject, Result, Value};

/// A plain property bag, used for events and error objects.
#[derive(Default)]
pub struct PlainObject {
    properties: Mutex<BTreeMap<String, Value>>,
}

impl PlainObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, property: &str, value: Value) {
        lock(&self.properties).insert(property.to_string(), value);
    }
}

impl NativeObject for PlainObject {
    fn get(&self, property: &str) -> Result<Value> {
        Ok(lock(&self.properties)
            .get(property)
            .cloned()
            .unwrap_or_default())
    }

    fn set(&self, property: &str, value: Value) -> Result<()> {
        let mut properties = lock(&self.properties);
        if value.is_null() {
            properties.remove(property);
        } else {
            properties.insert(property.to_string(), value);
        }
        Ok(())
    }

    fn call(&self, method: &str, _args: Vec<Value>) -> Result<Value> {
        Err(Error::native(format!("TypeError: {} is not a function", method)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

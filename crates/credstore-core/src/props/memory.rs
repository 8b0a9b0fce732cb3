//! In-memory property store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::PropertyStore;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every property, for assertions.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set_property(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut values = self.values.write();
        match value {
            Some(value) => {
                values.insert(key.to_string(), value.to_string());
            }
            None => {
                values.remove(key);
            }
        }
        Ok(())
    }

    fn keys_with_suffix(&self, suffix: &str) -> Result<Vec<String>> {
        Ok(self
            .values
            .read()
            .keys()
            .filter(|key| key.ends_with(suffix))
            .cloned()
            .collect())
    }

    fn remove_property(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

//! JSON file property store.
//!
//! The whole file is loaded at open and rewritten atomically after every
//! mutation, so a crash never leaves a half-written property file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use super::PropertyStore;
use crate::error::{CredError, Result};
use crate::fs::write_private_atomic;

pub struct JsonFilePropertyStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFilePropertyStore {
    /// Open the store at `path`. A missing file opens as an empty store and
    /// is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns `CredError::Property` if the file exists but is not a JSON
    /// object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|e| {
                    CredError::Property(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), properties = values.len(), "opened property file");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut values = self.values.write();
        let mut updated = values.clone();
        if !change(&mut updated) {
            return Ok(());
        }
        let encoded = serde_json::to_vec_pretty(&updated)?;
        write_private_atomic(&self.path, &encoded).map_err(|e| {
            CredError::Property(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        *values = updated;
        Ok(())
    }
}

impl PropertyStore for JsonFilePropertyStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set_property(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.mutate(|values| {
                values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
            }),
            None => self.remove_property(key),
        }
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
        self.mutate(|values| values.remove(key).is_some())
    }
}

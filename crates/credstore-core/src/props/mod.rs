//! Property store abstraction.
//!
//! The credential store never owns account configuration; it reads and
//! writes string properties in whatever store the host application uses.
//! Two implementations ship with the crate:
//! - **JsonFilePropertyStore**: a flat JSON object on disk
//! - **MemoryPropertyStore**: process-local, for tests and embedding

pub mod file;
pub mod memory;

use crate::error::Result;

pub use file::JsonFilePropertyStore;
pub use memory::MemoryPropertyStore;

/// Key/value property store interface.
pub trait PropertyStore: Send + Sync {
    /// Get a property value, `Ok(None)` when unset.
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Set a property. `None` removes it.
    fn set_property(&self, key: &str, value: Option<&str>) -> Result<()>;

    /// List every key ending with `suffix`, in sorted order.
    fn keys_with_suffix(&self, suffix: &str) -> Result<Vec<String>>;

    /// Remove a property. Removing an unset key succeeds.
    fn remove_property(&self, key: &str) -> Result<()>;
}

//! In-memory vault backend.

use std::collections::HashMap;

use parking_lot::Mutex;
use zeroize::Zeroizing;

use super::{SecretStore, VaultSlot};
use crate::crypto::MasterPassword;
use crate::error::{CredError, Result};

/// Process-local vault. Contents are wiped when dropped.
#[derive(Default)]
pub struct MemoryVault {
    slots: Mutex<HashMap<String, Zeroizing<String>>>,
    read_only: bool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vault pre-seeded with `secret` in `slot`.
    pub fn with_secret(slot: &VaultSlot, secret: &str) -> Self {
        let vault = Self::new();
        vault
            .slots
            .lock()
            .insert(slot.name().to_string(), Zeroizing::new(secret.to_string()));
        vault
    }

    /// A vault that rejects every write, like a locked OS keychain.
    pub fn read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }
}

impl SecretStore for MemoryVault {
    fn get(&self, slot: &VaultSlot) -> Result<Option<MasterPassword>> {
        let slots = self.slots.lock();
        Ok(slots
            .get(slot.name())
            .map(|value| MasterPassword::from(value.to_string())))
    }

    fn put(&self, slot: &VaultSlot, secret: MasterPassword) -> Result<()> {
        if self.read_only {
            return Err(CredError::Vault("vault is read-only".to_string()));
        }
        self.slots.lock().insert(
            slot.name().to_string(),
            Zeroizing::new(secret.expose().to_string()),
        );
        Ok(())
    }

    fn delete(&self, slot: &VaultSlot) -> Result<()> {
        if self.read_only {
            return Err(CredError::Vault("vault is read-only".to_string()));
        }
        self.slots.lock().remove(slot.name());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

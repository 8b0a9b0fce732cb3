//! OS keychain backend.

use super::{SecretStore, VaultSlot};
use crate::crypto::MasterPassword;
use crate::error::{CredError, Result};

/// Keychain service name every slot is filed under.
pub const KEYCHAIN_SERVICE: &str = "credstore";

/// Vault backed by the platform credential store
/// (Keychain, Secret Service or Windows Credential Manager).
#[derive(Debug, Clone)]
pub struct KeychainVault {
    service: String,
}

impl KeychainVault {
    pub fn new() -> Self {
        Self::with_service(KEYCHAIN_SERVICE)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, slot: &VaultSlot) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, slot.name())
            .map_err(|e| CredError::Vault(format!("Keychain entry failed: {}", e)))
    }
}

impl Default for KeychainVault {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeychainVault {
    fn get(&self, slot: &VaultSlot) -> Result<Option<MasterPassword>> {
        let entry = self.entry(slot)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(MasterPassword::from(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(CredError::Vault(format!("Keychain read failed: {}", err))),
        }
    }

    fn put(&self, slot: &VaultSlot, secret: MasterPassword) -> Result<()> {
        let entry = self.entry(slot)?;
        entry
            .set_password(secret.expose())
            .map_err(|e| CredError::Vault(format!("Keychain write failed: {}", e)))
    }

    fn delete(&self, slot: &VaultSlot) -> Result<()> {
        let entry = self.entry(slot)?;
        match entry.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(CredError::Vault(format!("Keychain delete failed: {}", err))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keychain"
    }
}

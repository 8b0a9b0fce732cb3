//! Keyfile vault backend.
//!
//! Stores master passwords unencrypted in an owner-only JSON file. Intended
//! for headless hosts without a platform keychain; anyone who can read the
//! file can decrypt every record protected by it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use zeroize::{Zeroize, Zeroizing};

use super::{SecretStore, VaultSlot};
use crate::crypto::MasterPassword;
use crate::error::{CredError, Result};
use crate::fs::write_private_atomic;

/// Vault stored in a plain keyfile.
pub struct KeyfileVault {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// Decoded keyfile contents, wiped on drop.
#[derive(Default)]
struct Slots(BTreeMap<String, String>);

impl Drop for Slots {
    fn drop(&mut self) {
        self.0.values_mut().for_each(Zeroize::zeroize);
    }
}

impl KeyfileVault {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<Slots> {
        if !self.path.exists() {
            return Ok(Slots::default());
        }
        let contents = Zeroizing::new(std::fs::read_to_string(&self.path).map_err(|e| {
            CredError::Vault(format!(
                "Failed to read keyfile {}: {}",
                self.path.display(),
                e
            ))
        })?);
        if contents.trim().is_empty() {
            return Ok(Slots::default());
        }
        let map = serde_json::from_str(&contents).map_err(|e| {
            CredError::Vault(format!(
                "Failed to parse keyfile {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Slots(map))
    }

    fn write_slots(&self, slots: &Slots) -> Result<()> {
        let encoded = Zeroizing::new(serde_json::to_vec_pretty(&slots.0)?);
        write_private_atomic(&self.path, &encoded).map_err(|e| {
            CredError::Vault(format!(
                "Failed to write keyfile {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl SecretStore for KeyfileVault {
    fn get(&self, slot: &VaultSlot) -> Result<Option<MasterPassword>> {
        let mut slots = self.read_slots()?;
        Ok(slots.0.remove(slot.name()).map(MasterPassword::from))
    }

    fn put(&self, slot: &VaultSlot, secret: MasterPassword) -> Result<()> {
        let _held = self.write_lock.lock();
        let mut slots = self.read_slots()?;
        if let Some(mut previous) = slots
            .0
            .insert(slot.name().to_string(), secret.expose().to_string())
        {
            previous.zeroize();
        }
        self.write_slots(&slots)
    }

    fn delete(&self, slot: &VaultSlot) -> Result<()> {
        let _held = self.write_lock.lock();
        let mut slots = self.read_slots()?;
        match slots.0.remove(slot.name()) {
            Some(mut previous) => {
                previous.zeroize();
                self.write_slots(&slots)
            }
            None => Ok(()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keyfile"
    }
}

//! Secure vault abstraction for master passwords.
//!
//! A vault holds exactly one master password per named slot. Backends:
//! - **KeychainVault**: the OS credential store via `keyring`
//! - **KeyfileVault**: an owner-only JSON file for headless hosts
//! - **MemoryVault**: process-local, for tests and embedding
//!
//! All access goes through [`SharedVault`], the single process-wide handle
//! whose mutex serializes bootstrap and rotation across every scope.

pub mod keychain;
pub mod keyfile;
pub mod memory;

use parking_lot::{Mutex, MutexGuard};

use crate::crypto::MasterPassword;
use crate::error::Result;

pub use keychain::KeychainVault;
pub use keyfile::KeyfileVault;
pub use memory::MemoryVault;

/// Application token prefixed to every user slot name.
pub const SLOT_TOKEN: &str = "credstore.master:";

/// Token of the installation-wide slot. Distinct from [`SLOT_TOKEN`] so the
/// global scope never shares a slot with a user scope of the same identity.
pub const GLOBAL_SLOT_TOKEN: &str = "credstore.master.global:";

/// Name of one master password slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultSlot {
    name: String,
}

impl VaultSlot {
    /// Slot for a signed-in identity: the application token followed by the identity.
    pub fn for_identity(identity: &str) -> Self {
        Self {
            name: format!("{}{}", SLOT_TOKEN, identity),
        }
    }

    /// Installation-wide slot of the global scope.
    pub fn global(identity: &str) -> Self {
        Self {
            name: format!("{}{}", GLOBAL_SLOT_TOKEN, identity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for VaultSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Backend interface for secure master password storage.
///
/// Implementations must not log or cache secret values.
pub trait SecretStore: Send + Sync {
    /// Read the password stored in `slot`.
    ///
    /// Returns `Ok(None)` when the slot is empty.
    fn get(&self, slot: &VaultSlot) -> Result<Option<MasterPassword>>;

    /// Store `secret` in `slot`, replacing any previous value.
    ///
    /// The secret is taken by value so it is wiped when this call returns,
    /// whether or not the write succeeded.
    fn put(&self, slot: &VaultSlot, secret: MasterPassword) -> Result<()>;

    /// Remove `slot`. Removing an empty slot succeeds.
    fn delete(&self, slot: &VaultSlot) -> Result<()>;

    /// Short backend name for status output.
    fn backend_name(&self) -> &'static str;
}

/// Process-wide vault handle plus the bootstrap mutex.
///
/// Construct once at startup and share it by `Arc` with every scope.
pub struct SharedVault {
    store: Box<dyn SecretStore>,
    bootstrap: Mutex<()>,
}

impl SharedVault {
    pub fn new(store: impl SecretStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            bootstrap: Mutex::new(()),
        }
    }

    /// Acquire the bootstrap lock. Vault reads and writes go through the guard.
    pub fn lock(&self) -> VaultGuard<'_> {
        VaultGuard {
            _held: self.bootstrap.lock(),
            store: self.store.as_ref(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}

impl std::fmt::Debug for SharedVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedVault")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

/// Exclusive access to the vault while bootstrapping or rotating.
pub struct VaultGuard<'a> {
    _held: MutexGuard<'a, ()>,
    store: &'a dyn SecretStore,
}

impl VaultGuard<'_> {
    pub fn get(&self, slot: &VaultSlot) -> Result<Option<MasterPassword>> {
        self.store.get(slot)
    }

    pub fn put(&self, slot: &VaultSlot, secret: MasterPassword) -> Result<()> {
        self.store.put(slot, secret)
    }

    pub fn delete(&self, slot: &VaultSlot) -> Result<()> {
        self.store.delete(slot)
    }
}

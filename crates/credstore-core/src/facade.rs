//! Global and user scopes behind one entry point.
//!
//! The global scope exists from construction. The user scope is created by
//! the first [`CredentialsFacade::activate_user`] call and never replaced.
//! Secrets handed over before that are buffered in memory and flushed into
//! the user scope on activation.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::KeyPolicy;
use crate::error::{CredError, Result};
use crate::props::PropertyStore;
use crate::store::{Scope, ScopedCredentialStore};
use crate::vault::{SharedVault, VaultSlot};

/// Outcome of [`CredentialsFacade::activate_user`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Whether this call created the user scope
    pub created: bool,
    /// Buffered names stored into the user scope
    pub flushed: Vec<String>,
    /// Buffered names whose store failed; their secrets are discarded
    pub failed: Vec<String>,
}

pub struct CredentialsFacade {
    vault: Arc<SharedVault>,
    policy: KeyPolicy,
    global: ScopedCredentialStore,
    user: OnceLock<ScopedCredentialStore>,
    pending: Mutex<BTreeMap<String, Zeroizing<String>>>,
}

impl CredentialsFacade {
    pub fn new(
        vault: Arc<SharedVault>,
        global_slot: VaultSlot,
        global_props: Arc<dyn PropertyStore>,
        policy: KeyPolicy,
    ) -> Self {
        let global = ScopedCredentialStore::new(
            Scope::Global,
            global_slot,
            vault.clone(),
            global_props,
            policy,
        );
        Self {
            vault,
            policy,
            global,
            user: OnceLock::new(),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn global(&self) -> &ScopedCredentialStore {
        &self.global
    }

    pub fn user(&self) -> Option<&ScopedCredentialStore> {
        self.user.get()
    }

    pub fn store(&self, scope: Scope) -> Option<&ScopedCredentialStore> {
        match scope {
            Scope::Global => Some(&self.global),
            Scope::User => self.user(),
        }
    }

    pub fn is_user_active(&self) -> bool {
        self.user.get().is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Hand over a user secret. Buffered until the user scope exists, stored
    /// straight into it afterwards.
    ///
    /// Returns `false` only when a direct store fails.
    pub fn buffer_secret(&self, name: &str, secret: &str) -> bool {
        {
            let mut pending = self.pending.lock();
            if self.user.get().is_none() {
                pending.insert(name.to_string(), Zeroizing::new(secret.to_string()));
                debug!(name, "buffered secret until user activation");
                return true;
            }
        }
        self.user
            .get()
            .is_some_and(|user| user.store_password(name, Some(secret)))
    }

    /// Create the user scope and flush every buffered secret into it.
    ///
    /// Only the first call has any effect; later calls return an empty report.
    pub fn activate_user(&self, slot: VaultSlot, props: Arc<dyn PropertyStore>) -> FlushReport {
        let mut pending = self.pending.lock();
        if self.user.get().is_some() {
            return FlushReport::default();
        }

        let user = self.user.get_or_init(|| {
            ScopedCredentialStore::new(Scope::User, slot, self.vault.clone(), props, self.policy)
        });
        info!(slot = %user.slot(), buffered = pending.len(), "user scope activated");

        let mut report = FlushReport {
            created: true,
            ..FlushReport::default()
        };
        while let Some((name, secret)) = pending.pop_first() {
            if user.store_password(&name, Some(secret.as_str())) {
                report.flushed.push(name);
            } else {
                warn!(name = %name, "failed to flush buffered secret");
                report.failed.push(name);
            }
        }
        report
    }

    /// Rotate the master password of one scope.
    ///
    /// # Errors
    ///
    /// Returns `CredError::InvalidInput` when the scope is not active or when
    /// both scopes share a vault slot, and `CredError::Rotation` when the
    /// rotation itself fails.
    pub fn rotate_master_password(&self, scope: Scope) -> Result<()> {
        let store = self
            .store(scope)
            .ok_or_else(|| CredError::InvalidInput(format!("{} scope is not active", scope)))?;
        if let Some(user) = self.user() {
            if user.slot() == self.global.slot() {
                return Err(CredError::InvalidInput(format!(
                    "global and user scopes share vault slot {}",
                    user.slot()
                )));
            }
        }
        store.rotate_master_password()
    }
}

impl std::fmt::Debug for CredentialsFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsFacade")
            .field("vault", &self.vault)
            .field("global", &self.global)
            .field("user", &self.user.get())
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

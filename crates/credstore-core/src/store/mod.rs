//! Scoped credential store.
//!
//! One [`ScopedCredentialStore`] serves one credential namespace. It starts
//! uninitialized and binds a key ring on the first call that needs crypto:
//! an existing master password is read from the vault, otherwise a fresh one
//! is created by rotation. Every bind is followed by a legacy migration pass.
//!
//! Locking: each store serializes its own operations with an instance lock,
//! and takes the process-wide vault lock only for bootstrap and rotation.
//! The order is always instance lock, then vault lock.

pub mod migration;
pub mod records;
mod rotation;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};

use crate::crypto::{KeyLength, KeyPolicy, MultiKeyCipher};
use crate::error::{CredError, Result};
use crate::props::PropertyStore;
use crate::vault::{SharedVault, VaultGuard, VaultSlot};

pub use migration::MigrationReport;
pub use records::{RecordKind, StoredRecord, ENCRYPTED_SUFFIX, LEGACY_SUFFIX};

use records::{encrypted_key, prefix_of, spice, strip_spice, validate_prefix};

/// Credential namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Installation-wide
    Global,
    /// Per signed-in profile
    User,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::User => "user",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a scoped store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Ready,
}

pub struct ScopedCredentialStore {
    scope: Scope,
    slot: VaultSlot,
    vault: Arc<SharedVault>,
    props: Arc<dyn PropertyStore>,
    policy: KeyPolicy,
    cipher: Mutex<Option<MultiKeyCipher>>,
}

impl ScopedCredentialStore {
    pub fn new(
        scope: Scope,
        slot: VaultSlot,
        vault: Arc<SharedVault>,
        props: Arc<dyn PropertyStore>,
        policy: KeyPolicy,
    ) -> Self {
        Self {
            scope,
            slot,
            vault,
            props,
            policy,
            cipher: Mutex::new(None),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn slot(&self) -> &VaultSlot {
        &self.slot
    }

    pub fn state(&self) -> StoreState {
        if self.cipher.lock().is_some() {
            StoreState::Ready
        } else {
            StoreState::Uninitialized
        }
    }

    /// Key lengths of the bound ring, `None` while uninitialized.
    pub fn key_lengths(&self) -> Option<Vec<KeyLength>> {
        self.cipher.lock().as_ref().map(MultiKeyCipher::key_lengths)
    }

    /// Encrypt and store `secret` for `prefix`. `None` deletes the record.
    ///
    /// Returns `false` on any failure; the cause is logged.
    pub fn store_password(&self, prefix: &str, secret: Option<&str>) -> bool {
        let mut cipher = self.cipher.lock();
        match self.try_store(&mut cipher, prefix, secret) {
            Ok(()) => true,
            Err(err) => {
                error!(scope = %self.scope, prefix, error = %err, "failed to store password");
                false
            }
        }
    }

    /// Decrypt the secret stored for `prefix`.
    ///
    /// Returns `None` when no record exists (without bootstrapping) or when
    /// the record cannot be decrypted; the latter is logged.
    pub fn load_password(&self, prefix: &str) -> Option<SecretString> {
        let mut cipher = self.cipher.lock();
        match self.try_load(&mut cipher, prefix) {
            Ok(secret) => secret,
            Err(err) => {
                error!(scope = %self.scope, prefix, error = %err, "failed to load password");
                None
            }
        }
    }

    /// Delete the encrypted record for `prefix`. Never fails; errors are logged.
    pub fn remove_password(&self, prefix: &str) {
        let _serialized = self.cipher.lock();
        if let Err(err) = self.props.remove_property(&encrypted_key(prefix)) {
            warn!(scope = %self.scope, prefix, error = %err, "failed to remove password");
        }
    }

    /// Whether an encrypted record exists for `prefix`.
    pub fn is_encrypted(&self, prefix: &str) -> bool {
        match self.props.get_string(&encrypted_key(prefix)) {
            Ok(value) => value.is_some(),
            Err(err) => {
                warn!(scope = %self.scope, prefix, error = %err, "failed to read record");
                false
            }
        }
    }

    /// Every stored credential record, encrypted first, each sorted by prefix.
    pub fn list_records(&self) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        for (suffix, kind) in [
            (ENCRYPTED_SUFFIX, RecordKind::Encrypted),
            (LEGACY_SUFFIX, RecordKind::LegacyPlaintext),
        ] {
            for key in self.props.keys_with_suffix(suffix)? {
                let Some(prefix) = prefix_of(&key, suffix) else {
                    continue;
                };
                records.push(StoredRecord {
                    prefix: prefix.to_string(),
                    kind,
                });
            }
        }
        Ok(records)
    }

    /// Bootstrap if needed and migrate every legacy plaintext record.
    ///
    /// The report includes records migrated by the bootstrap itself.
    pub fn migrate_legacy_plaintext(&self) -> Result<MigrationReport> {
        let mut slot = self.cipher.lock();
        let mut report = if slot.is_none() {
            let vault = self.vault.lock();
            self.bootstrap(&vault, &mut slot)?
        } else {
            MigrationReport::default()
        };
        let cipher = bound(&slot)?;
        report.absorb(migration::migrate_legacy_plaintext(
            self.scope,
            self.props.as_ref(),
            cipher,
        )?);
        Ok(report)
    }

    /// Replace the master password and re-encrypt every record under it.
    ///
    /// # Errors
    ///
    /// Returns `CredError::Rotation` on failure; the store is then
    /// uninitialized and binds again on its next use.
    pub fn rotate_master_password(&self) -> Result<()> {
        let mut slot = self.cipher.lock();
        let vault = self.vault.lock();
        self.rotate_locked(&vault, &mut slot).map(|_| ())
    }

    fn try_store(
        &self,
        slot: &mut Option<MultiKeyCipher>,
        prefix: &str,
        secret: Option<&str>,
    ) -> Result<()> {
        validate_prefix(prefix)?;
        let cipher = self.ensure_ready(slot)?;
        let key = encrypted_key(prefix);
        match secret {
            None => self.props.remove_property(&key),
            Some(secret) => {
                let ciphertext = cipher.encrypt(&spice(prefix, secret))?;
                self.props.set_property(&key, Some(&ciphertext))
            }
        }
    }

    fn try_load(
        &self,
        slot: &mut Option<MultiKeyCipher>,
        prefix: &str,
    ) -> Result<Option<SecretString>> {
        let Some(ciphertext) = self.props.get_string(&encrypted_key(prefix))? else {
            return Ok(None);
        };
        let cipher = self.ensure_ready(slot)?;
        let plaintext =
            cipher.decrypt_matching(&ciphertext, |value| value.starts_with(prefix))?;
        let mut secret = strip_spice(prefix, &plaintext)?;
        Ok(Some(SecretString::from(std::mem::take(&mut *secret))))
    }

    fn ensure_ready<'a>(
        &self,
        slot: &'a mut Option<MultiKeyCipher>,
    ) -> Result<&'a MultiKeyCipher> {
        if slot.is_none() {
            let vault = self.vault.lock();
            self.bootstrap(&vault, slot)?;
        }
        bound(slot)
    }

    fn bootstrap(
        &self,
        vault: &VaultGuard<'_>,
        slot: &mut Option<MultiKeyCipher>,
    ) -> Result<MigrationReport> {
        let Some(password) = vault.get(&self.slot)? else {
            info!(scope = %self.scope, slot = %self.slot, "no master password, creating one");
            return self.rotate_locked(vault, slot);
        };
        let cipher = MultiKeyCipher::new(&password, &self.policy)?;
        drop(password);
        debug!(scope = %self.scope, ring = ?cipher, "key ring bound");

        let report = self.migrate_after_bind(&cipher);
        *slot = Some(cipher);
        Ok(report)
    }

    fn rotate_locked(
        &self,
        vault: &VaultGuard<'_>,
        slot: &mut Option<MultiKeyCipher>,
    ) -> Result<MigrationReport> {
        *slot = None;
        match rotation::rotate(
            self.scope,
            self.props.as_ref(),
            &self.policy,
            vault,
            &self.slot,
        ) {
            Ok(rotated) => {
                info!(
                    scope = %self.scope,
                    records = rotated.transcoded,
                    "master password rotated"
                );
                let report = self.migrate_after_bind(&rotated.cipher);
                *slot = Some(rotated.cipher);
                Ok(report)
            }
            Err(err) => {
                warn!(scope = %self.scope, error = %err, "master password rotation failed");
                Err(match err {
                    CredError::Rotation(_) => err,
                    other => CredError::Rotation(other.to_string()),
                })
            }
        }
    }

    /// Migration failures after a bind are logged and do not undo the bind.
    fn migrate_after_bind(&self, cipher: &MultiKeyCipher) -> MigrationReport {
        match migration::migrate_legacy_plaintext(self.scope, self.props.as_ref(), cipher) {
            Ok(report) => report,
            Err(err) => {
                warn!(scope = %self.scope, error = %err, "legacy migration failed");
                MigrationReport::default()
            }
        }
    }
}

impl fmt::Debug for ScopedCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCredentialStore")
            .field("scope", &self.scope)
            .field("slot", &self.slot.name())
            .field("state", &self.state())
            .finish()
    }
}

fn bound(slot: &Option<MultiKeyCipher>) -> Result<&MultiKeyCipher> {
    slot.as_ref()
        .ok_or_else(|| CredError::Rotation("key ring is not bound".to_string()))
}

//! Master password rotation.
//!
//! Rotation runs in three phases under the vault lock:
//! 1. decrypt every encrypted record with the old ring into zeroizing memory
//! 2. generate the new master password and persist it to the vault
//! 3. re-encrypt and write every staged record with the new ring
//!
//! A record that cannot be decrypted aborts phase 1, before the vault or any
//! record is touched. A failure in phase 3 leaves a mix of rewritten and
//! untouched records; the caller resets the store to uninitialized.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::records::{prefix_of, spice, ENCRYPTED_SUFFIX};
use super::Scope;
use crate::crypto::{KeyPolicy, MasterPassword, MultiKeyCipher};
use crate::error::{CredError, Result};
use crate::props::PropertyStore;
use crate::vault::{VaultGuard, VaultSlot};

/// Result of a completed rotation.
pub(crate) struct Rotated {
    pub cipher: MultiKeyCipher,
    pub transcoded: usize,
}

struct StagedRecord {
    key: String,
    plaintext: Zeroizing<String>,
}

pub(crate) fn rotate(
    scope: Scope,
    props: &dyn PropertyStore,
    policy: &KeyPolicy,
    vault: &VaultGuard<'_>,
    slot: &VaultSlot,
) -> Result<Rotated> {
    let previous = vault.get(slot)?;
    let unspiced = previous.is_none();
    let old_password = previous.unwrap_or_else(MasterPassword::legacy_default);
    let old_ring = MultiKeyCipher::new(&old_password, policy)?;
    drop(old_password);

    let staged = stage_records(scope, props, &old_ring, unspiced)?;
    drop(old_ring);

    let new_password = MasterPassword::generate()?;
    let new_ring = MultiKeyCipher::new(&new_password, policy)?;
    vault.put(slot, new_password)?;
    info!(%scope, %slot, first = unspiced, "stored new master password");

    for record in &staged {
        let ciphertext = new_ring.encrypt(&record.plaintext)?;
        props
            .set_property(&record.key, Some(&ciphertext))
            .map_err(|e| CredError::Rotation(format!("{}: {}", record.key, e)))?;
    }

    Ok(Rotated {
        cipher: new_ring,
        transcoded: staged.len(),
    })
}

/// Decrypt every encrypted record with the old ring.
///
/// Records from before the first master password carry no spice; it is
/// added here so the rewritten records are bound to their prefix.
fn stage_records(
    scope: Scope,
    props: &dyn PropertyStore,
    old_ring: &MultiKeyCipher,
    unspiced: bool,
) -> Result<Vec<StagedRecord>> {
    let mut staged = Vec::new();

    for key in props.keys_with_suffix(ENCRYPTED_SUFFIX)? {
        let Some(prefix) = prefix_of(&key, ENCRYPTED_SUFFIX) else {
            continue;
        };
        let Some(ciphertext) = props.get_string(&key)? else {
            continue;
        };
        if ciphertext.trim().is_empty() {
            warn!(%scope, prefix, "skipping empty encrypted record");
            continue;
        }

        let plaintext = if unspiced {
            old_ring
                .decrypt(&ciphertext)
                .map(|secret| spice(prefix, &secret))
        } else {
            old_ring.decrypt_matching(&ciphertext, |value| value.starts_with(prefix))
        }
        .map_err(|e| CredError::Rotation(format!("{}: {}", key, e)))?;

        debug!(%scope, prefix, "staged record for re-encryption");
        staged.push(StagedRecord { key, plaintext });
    }

    Ok(staged)
}

//! Migration of legacy Base64 plaintext records.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::records::{encrypted_key, prefix_of, spice, LEGACY_SUFFIX};
use super::Scope;
use crate::crypto::MultiKeyCipher;
use crate::error::{CredError, Result};
use crate::props::PropertyStore;

/// Outcome of a migration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Legacy records encrypted and removed
    pub migrated: usize,
    /// Legacy records removed without migrating (empty, or already encrypted)
    pub discarded: usize,
    /// Legacy records left in place because they could not be migrated
    pub failed: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.migrated == 0 && self.discarded == 0
    }

    pub fn absorb(&mut self, other: MigrationReport) {
        self.migrated += other.migrated;
        self.discarded += other.discarded;
        self.failed += other.failed;
    }
}

/// Encrypt every legacy plaintext record and delete it.
///
/// A legacy record is dropped without migrating when its value is empty or
/// when an encrypted record for the same prefix already exists. Records that
/// fail to migrate are left untouched and counted.
pub(crate) fn migrate_legacy_plaintext(
    scope: Scope,
    props: &dyn PropertyStore,
    cipher: &MultiKeyCipher,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for key in props.keys_with_suffix(LEGACY_SUFFIX)? {
        let Some(prefix) = prefix_of(&key, LEGACY_SUFFIX) else {
            continue;
        };
        let Some(value) = props.get_string(&key)? else {
            continue;
        };
        let value = Zeroizing::new(value);

        let already_encrypted = props.get_string(&encrypted_key(prefix))?.is_some();
        if value.trim().is_empty() || already_encrypted {
            props.remove_property(&key)?;
            debug!(%scope, prefix, already_encrypted, "discarded legacy password record");
            report.discarded += 1;
            continue;
        }

        match migrate_record(props, cipher, &key, prefix, &value) {
            Ok(()) => {
                info!(%scope, prefix, "migrated legacy password record");
                report.migrated += 1;
            }
            Err(err) => {
                warn!(%scope, prefix, error = %err, "failed to migrate legacy password record");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn migrate_record(
    props: &dyn PropertyStore,
    cipher: &MultiKeyCipher,
    key: &str,
    prefix: &str,
    encoded: &str,
) -> Result<()> {
    let malformed = |reason: String| CredError::MalformedRecord {
        key: key.to_string(),
        reason,
    };

    let mut decoded = Zeroizing::new(
        STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| malformed(format!("invalid Base64: {}", e)))?,
    );
    let secret = Zeroizing::new(
        String::from_utf8(std::mem::take(&mut *decoded))
            .map_err(|_| malformed("value is not UTF-8".to_string()))?,
    );

    let ciphertext = cipher.encrypt(&spice(prefix, &secret))?;
    props.set_property(&encrypted_key(prefix), Some(&ciphertext))?;
    props.remove_property(key)
}

//! Property key naming and spice handling.

use zeroize::Zeroizing;

use crate::error::{CredError, Result};

/// Suffix of encrypted password records.
pub const ENCRYPTED_SUFFIX: &str = ".ENCRYPTED_PASSWORD";

/// Suffix of legacy Base64 plaintext records.
pub const LEGACY_SUFFIX: &str = ".PASSWORD";

/// Kind of credential record found in a property store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Encrypted,
    LegacyPlaintext,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Encrypted => "encrypted",
            RecordKind::LegacyPlaintext => "legacy",
        }
    }
}

/// A credential record, without its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub prefix: String,
    pub kind: RecordKind,
}

pub fn encrypted_key(prefix: &str) -> String {
    format!("{}{}", prefix, ENCRYPTED_SUFFIX)
}

pub fn legacy_key(prefix: &str) -> String {
    format!("{}{}", prefix, LEGACY_SUFFIX)
}

/// Account prefix of a record key, if it carries `suffix`.
pub fn prefix_of<'a>(key: &'a str, suffix: &str) -> Option<&'a str> {
    key.strip_suffix(suffix).filter(|prefix| !prefix.is_empty())
}

pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        return Err(CredError::InvalidInput(
            "Account prefix cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Bind `secret` to `prefix` ahead of encryption.
pub(crate) fn spice(prefix: &str, secret: &str) -> Zeroizing<String> {
    let mut spiced = Zeroizing::new(String::with_capacity(prefix.len() + secret.len()));
    spiced.push_str(prefix);
    spiced.push_str(secret);
    spiced
}

/// Recover the secret from a decrypted value bound to `prefix`.
///
/// The result is allocated at its exact length so it can be handed to a
/// `SecretString` without reallocating.
pub(crate) fn strip_spice(prefix: &str, plaintext: &str) -> Result<Zeroizing<String>> {
    let secret = plaintext
        .strip_prefix(prefix)
        .ok_or_else(|| CredError::SpiceMismatch(prefix.to_string()))?;
    let mut out = Zeroizing::new(String::with_capacity(secret.len()));
    out.push_str(secret);
    Ok(out)
}

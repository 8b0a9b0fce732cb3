//! Key ring cipher with try-all-keys decryption.
//!
//! A ring holds one key per permitted length, strongest first. New values are
//! always encrypted with the strongest key; decryption walks the ring so that
//! values written by releases that only had shorter keys stay readable.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use super::key::{EncryptionKey, KeyLength, KeyPolicy};
use super::master::MasterPassword;
use crate::error::{CredError, Result};

/// Ordered ring of AES keys derived from one master password.
///
/// Holds no lock of its own; owners serialize access.
pub struct MultiKeyCipher {
    keys: Vec<EncryptionKey>,
}

impl MultiKeyCipher {
    /// Build a key ring from `password`.
    ///
    /// Each candidate length is an independent attempt; failed attempts are
    /// skipped and the ring keeps whatever succeeded.
    ///
    /// # Errors
    ///
    /// Returns `CredError::NoUsableKey` if no length could be derived.
    pub fn new(password: &MasterPassword, policy: &KeyPolicy) -> Result<Self> {
        let attempts = KeyLength::CANDIDATES
            .iter()
            .map(|&length| (length, EncryptionKey::derive(password.as_bytes(), length, policy)));

        let mut keys = Vec::with_capacity(KeyLength::CANDIDATES.len());
        for (length, attempt) in attempts {
            match attempt {
                Ok(key) => keys.push(key),
                Err(err) => debug!(bits = length.bits(), error = %err, "skipping key length"),
            }
        }

        if keys.is_empty() {
            warn!(max_key_bits = policy.max_key_bits, "no usable key length");
            return Err(CredError::NoUsableKey);
        }
        Ok(Self { keys })
    }

    /// Key lengths in the ring, in probing order.
    pub fn key_lengths(&self) -> Vec<KeyLength> {
        self.keys.iter().map(EncryptionKey::length).collect()
    }

    /// Encrypt `plaintext` with the strongest key and Base64-encode the result.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let strongest = self
            .keys
            .first()
            .ok_or_else(|| CredError::Encryption("Key ring is empty".to_string()))?;
        let ciphertext = strongest.encrypt(plaintext.as_bytes())?;
        Ok(STANDARD.encode(ciphertext))
    }

    /// Decrypt a Base64 ciphertext with the first key that succeeds.
    pub fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>> {
        self.decrypt_matching(ciphertext, |_| true)
    }

    /// Decrypt like [`decrypt`](Self::decrypt), treating any output rejected
    /// by `accept` as a wrong-key result and moving on to the next key.
    ///
    /// # Errors
    ///
    /// Returns the error of the last key tried when no key succeeds.
    pub fn decrypt_matching<F>(&self, ciphertext: &str, accept: F) -> Result<Zeroizing<String>>
    where
        F: Fn(&str) -> bool,
    {
        let raw = STANDARD
            .decode(ciphertext.trim().as_bytes())
            .map_err(|e| CredError::Decryption(format!("Invalid Base64: {}", e)))?;

        let mut last_error = CredError::WrongKey;
        for key in &self.keys {
            let attempt = key.decrypt(&raw).and_then(into_utf8);
            match attempt {
                Ok(plaintext) if accept(&plaintext) => return Ok(plaintext),
                Ok(_) => last_error = CredError::WrongKey,
                Err(err) => last_error = err,
            }
            debug!(bits = key.length().bits(), error = %last_error, "key did not match");
        }
        Err(last_error)
    }
}

impl std::fmt::Debug for MultiKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits: Vec<u32> = self.keys.iter().map(|key| key.length().bits()).collect();
        f.debug_struct("MultiKeyCipher").field("bits", &bits).finish()
    }
}

/// Convert decrypted bytes to a string without leaving copies behind.
fn into_utf8(mut bytes: Zeroizing<Vec<u8>>) -> Result<Zeroizing<String>> {
    match String::from_utf8(std::mem::take(&mut *bytes)) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(err) => {
            let mut raw = err.into_bytes();
            raw.zeroize();
            Err(CredError::WrongKey)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(password: &str, policy: KeyPolicy) -> MultiKeyCipher {
        MultiKeyCipher::new(&MasterPassword::from(password.to_string()), &policy).unwrap()
    }

    #[test]
    fn test_ring_order_strongest_first() {
        let ring = cipher("master", KeyPolicy::default());
        assert_eq!(ring.key_lengths(), vec![KeyLength::Aes256, KeyLength::Aes128]);
    }

    #[test]
    fn test_restricted_policy_skips_long_keys() {
        let ring = cipher("master", KeyPolicy::restricted(128));
        assert_eq!(ring.key_lengths(), vec![KeyLength::Aes128]);
    }

    #[test]
    fn test_no_usable_key_is_fatal() {
        let result = MultiKeyCipher::new(
            &MasterPassword::from("master".to_string()),
            &KeyPolicy::restricted(64),
        );
        assert!(matches!(result, Err(CredError::NoUsableKey)));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let ring = cipher("master", KeyPolicy::default());
        let ciphertext = ring.encrypt("acct1sekret1").unwrap();
        assert_ne!(ciphertext, "acct1sekret1");

        let plaintext = ring.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext.as_str(), "acct1sekret1");
    }

    #[test]
    fn test_unicode_round_trip() {
        let ring = cipher("master", KeyPolicy::default());
        let ciphertext = ring.encrypt("acct1pässwörd✓").unwrap();
        assert_eq!(ring.decrypt(&ciphertext).unwrap().as_str(), "acct1pässwörd✓");
    }

    #[test]
    fn test_weaker_key_ciphertext_survives_ring_growth() {
        let old_ring = cipher("master", KeyPolicy::restricted(128));
        let ciphertext = old_ring.encrypt("acct1sekret1").unwrap();

        let new_ring = cipher("master", KeyPolicy::default());
        let plaintext = new_ring
            .decrypt_matching(&ciphertext, |value| value.starts_with("acct1"))
            .unwrap();
        assert_eq!(plaintext.as_str(), "acct1sekret1");
    }

    #[test]
    fn test_encrypt_uses_strongest_key() {
        let ring = cipher("master", KeyPolicy::default());
        let ciphertext = ring.encrypt("acct1sekret1").unwrap();

        let weak_only = cipher("master", KeyPolicy::restricted(128));
        let result = weak_only.decrypt_matching(&ciphertext, |value| value.starts_with("acct1"));
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_password_fails() {
        let ring = cipher("master", KeyPolicy::default());
        let ciphertext = ring.encrypt("acct1sekret1").unwrap();

        let other = cipher("other-master", KeyPolicy::default());
        let result = other.decrypt_matching(&ciphertext, |value| value.starts_with("acct1"));
        assert!(result.unwrap_err().is_wrong_key());
    }

    #[test]
    fn test_invalid_base64_is_decryption_error() {
        let ring = cipher("master", KeyPolicy::default());
        let result = ring.decrypt("not base64!!");
        assert!(matches!(result, Err(CredError::Decryption(_))));
    }

    #[test]
    fn test_truncated_ciphertext_is_decryption_error() {
        let ring = cipher("master", KeyPolicy::default());
        let truncated = STANDARD.encode([7u8; 20]);
        let result = ring.decrypt(&truncated);
        assert!(matches!(result, Err(CredError::Decryption(_))));
    }

    #[test]
    fn test_ecb_is_deterministic() {
        // ECB has no IV
        let ring = cipher("master", KeyPolicy::default());
        assert_eq!(ring.encrypt("acct1x").unwrap(), ring.encrypt("acct1x").unwrap());
    }

    #[test]
    fn test_legacy_default_ring() {
        let ring = MultiKeyCipher::new(&MasterPassword::legacy_default(), &KeyPolicy::default())
            .unwrap();
        let ciphertext = ring.encrypt("old-secret").unwrap();
        assert_eq!(ring.decrypt(&ciphertext).unwrap().as_str(), "old-secret");
    }

    #[test]
    fn test_legacy_default_known_ciphertext() {
        let ring = MultiKeyCipher::new(&MasterPassword::legacy_default(), &KeyPolicy::default())
            .unwrap();
        assert_eq!(ring.encrypt("acct1sekret1").unwrap(), "YftoWVyPTlyhRjJI0vY+kA==");

        // Written by a 128-bit-only release
        let plaintext = ring
            .decrypt_matching("1r35DUZYBLPclMpEfZ0R9w==", |value| value.starts_with("acct1"))
            .unwrap();
        assert_eq!(plaintext.as_str(), "acct1sekret1");
    }

    #[test]
    fn test_debug_lists_bits_only() {
        let ring = cipher("master", KeyPolicy::default());
        let debug_output = format!("{:?}", ring);
        assert!(debug_output.contains("256"));
        assert!(debug_output.contains("128"));
        assert!(!debug_output.contains("master"));
    }
}

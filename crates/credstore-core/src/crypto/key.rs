//! Key derivation using PBKDF2-HMAC-SHA1.
//!
//! The parameters here are fixed: records written by every earlier release
//! were produced with them, and changing any value makes those records
//! unreadable.

use aes::{Aes128, Aes256};
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, InvalidLength, KeyInit};
use hmac::Hmac;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::error::{CredError, Result};

/// Fixed PBKDF2 salt.
pub const SALT: [u8; 8] = [0x0C, 0x0A, 0x0F, 0x0E, 0x0B, 0x0E, 0x0E, 0x0F];

/// PBKDF2 iteration count.
pub const ITERATIONS: u32 = 1024;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;
type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

/// AES key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyLength {
    Aes256,
    Aes128,
}

impl KeyLength {
    /// Key lengths tried when building a key ring, strongest first.
    pub const CANDIDATES: [KeyLength; 2] = [KeyLength::Aes256, KeyLength::Aes128];

    pub fn bits(self) -> u32 {
        match self {
            KeyLength::Aes256 => 256,
            KeyLength::Aes128 => 128,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            256 => Some(KeyLength::Aes256),
            128 => Some(KeyLength::Aes128),
            _ => None,
        }
    }
}

/// Which key lengths the runtime is allowed to use.
///
/// Restricting `max_key_bits` to 128 reproduces hosts whose crypto policy
/// forbids 256-bit AES; rings built there only hold the 128-bit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicy {
    pub max_key_bits: u32,
}

impl KeyPolicy {
    pub fn unrestricted() -> Self {
        Self { max_key_bits: 256 }
    }

    pub fn restricted(max_key_bits: u32) -> Self {
        Self { max_key_bits }
    }

    pub fn allows(&self, length: KeyLength) -> bool {
        length.bits() <= self.max_key_bits
    }
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self::unrestricted()
    }
}

/// An AES key derived from a master password.
///
/// Key bytes are zeroized when the key is dropped.
pub struct EncryptionKey {
    length: KeyLength,
    key: Zeroizing<Vec<u8>>,
}

impl EncryptionKey {
    /// Derive a key of `length` from `password` with the fixed salt and
    /// iteration count.
    ///
    /// # Errors
    ///
    /// Returns `CredError::InvalidInput` if the policy forbids `length`, or
    /// `CredError::Encryption` if derivation or cipher initialization fails.
    pub fn derive(password: &[u8], length: KeyLength, policy: &KeyPolicy) -> Result<Self> {
        if !policy.allows(length) {
            return Err(CredError::InvalidInput(format!(
                "{}-bit keys are not permitted (max {})",
                length.bits(),
                policy.max_key_bits
            )));
        }

        let key = derive_bytes(password, &SALT, ITERATIONS, length.bytes())?;
        Self::from_raw(length, key)
    }

    /// Bind raw key bytes to a key length, checking that both ciphers accept it.
    pub(crate) fn from_raw(length: KeyLength, key: Zeroizing<Vec<u8>>) -> Result<Self> {
        let init = match length {
            KeyLength::Aes256 => Aes256EcbEnc::new_from_slice(&key)
                .and_then(|_| Aes256EcbDec::new_from_slice(&key))
                .map(|_| ()),
            KeyLength::Aes128 => Aes128EcbEnc::new_from_slice(&key)
                .and_then(|_| Aes128EcbDec::new_from_slice(&key))
                .map(|_| ()),
        };
        init.map_err(|e| {
            CredError::Encryption(format!(
                "Failed to initialize {}-bit cipher: {}",
                length.bits(),
                e
            ))
        })?;

        Ok(Self { length, key })
    }

    pub fn length(&self) -> KeyLength {
        self.length
    }

    /// Encrypt `plaintext` with PKCS#5 padding.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let bits = self.length.bits();
        let init_error =
            |e: InvalidLength| CredError::Encryption(format!("{}-bit cipher: {}", bits, e));
        let ciphertext = match self.length {
            KeyLength::Aes256 => Aes256EcbEnc::new_from_slice(&self.key)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            KeyLength::Aes128 => Aes128EcbEnc::new_from_slice(&self.key)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };
        Ok(ciphertext)
    }

    /// Decrypt `ciphertext` and strip its padding.
    ///
    /// # Errors
    ///
    /// Returns `CredError::WrongKey` when the padding does not check out and
    /// `CredError::Decryption` when the input is not a whole number of blocks.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CredError::Decryption(format!(
                "Ciphertext length {} is not a multiple of the block size",
                ciphertext.len()
            )));
        }

        let bits = self.length.bits();
        let init_error =
            |e: InvalidLength| CredError::Decryption(format!("{}-bit cipher: {}", bits, e));
        let plaintext = match self.length {
            KeyLength::Aes256 => Aes256EcbDec::new_from_slice(&self.key)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            KeyLength::Aes128 => Aes128EcbDec::new_from_slice(&self.key)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };
        plaintext
            .map(Zeroizing::new)
            .map_err(|_| CredError::WrongKey)
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bits", &self.length.bits())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Raw PBKDF2-HMAC-SHA1 output.
fn derive_bytes(
    password: &[u8],
    salt: &[u8],
    rounds: u32,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, rounds, &mut out)
        .map_err(|e| CredError::Encryption(format!("Key derivation failed: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_sha1_rfc6070_vectors() {
        let one = derive_bytes(b"password", b"salt", 1, 20).unwrap();
        assert_eq!(hex::encode(&*one), "0c60c80f961f0e71f3a9b524af6012062fe037a6");

        let two = derive_bytes(b"password", b"salt", 2, 20).unwrap();
        assert_eq!(hex::encode(&*two), "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957");

        let many = derive_bytes(b"password", b"salt", 4096, 20).unwrap();
        assert_eq!(hex::encode(&*many), "4b007901b765489abead49d926f721d065a429c1");
    }

    #[test]
    fn test_legacy_password_known_keys() {
        let policy = KeyPolicy::default();
        let full = derive_bytes(b" ", &SALT, ITERATIONS, 32).unwrap();
        assert_eq!(
            hex::encode(&*full),
            "f2932784775623409d75d227cc6f5ec1f9845b8e6bd14c91c0f52dbcc58f93d1"
        );

        let strong = EncryptionKey::derive(b" ", KeyLength::Aes256, &policy).unwrap();
        let weak = EncryptionKey::derive(b" ", KeyLength::Aes128, &policy).unwrap();
        assert_eq!(&*strong.key, &*full);
        assert_eq!(hex::encode(&*weak.key), "f2932784775623409d75d227cc6f5ec1");
    }

    #[test]
    fn test_aes128_ecb_fips197_block() {
        let raw = Zeroizing::new(hex::decode("000102030405060708090a0b0c0d0e0f").unwrap());
        let key = EncryptionKey::from_raw(KeyLength::Aes128, raw).unwrap();
        let plaintext = hex::decode("00112233445566778899aabbccddeeff").unwrap();

        let ciphertext = key.encrypt(&plaintext).unwrap();

        // A full block of padding follows a block-aligned input
        assert_eq!(ciphertext.len(), 32);
        assert_eq!(hex::encode(&ciphertext[..16]), "69c4e0d86a7b0430d8cdb78070b4c55a");
        assert_eq!(&*key.decrypt(&ciphertext).unwrap(), &plaintext);
    }

    #[test]
    fn test_derivation_deterministic() {
        let policy = KeyPolicy::default();
        let key1 = EncryptionKey::derive(b"master", KeyLength::Aes256, &policy).unwrap();
        let key2 = EncryptionKey::derive(b"master", KeyLength::Aes256, &policy).unwrap();

        let ciphertext = key1.encrypt(b"same input").unwrap();
        assert_eq!(ciphertext, key2.encrypt(b"same input").unwrap());
    }

    #[test]
    fn test_key_lengths_produce_distinct_ciphertext() {
        let policy = KeyPolicy::default();
        let strong = EncryptionKey::derive(b"master", KeyLength::Aes256, &policy).unwrap();
        let weak = EncryptionKey::derive(b"master", KeyLength::Aes128, &policy).unwrap();

        assert_ne!(
            strong.encrypt(b"account secret").unwrap(),
            weak.encrypt(b"account secret").unwrap()
        );
    }

    #[test]
    fn test_policy_rejects_long_keys() {
        let policy = KeyPolicy::restricted(128);
        let result = EncryptionKey::derive(b"master", KeyLength::Aes256, &policy);
        assert!(matches!(result, Err(CredError::InvalidInput(_))));
        assert!(EncryptionKey::derive(b"master", KeyLength::Aes128, &policy).is_ok());
    }

    #[test]
    fn test_wrong_raw_length_rejected() {
        let raw = Zeroizing::new(vec![0u8; 10]);
        let result = EncryptionKey::from_raw(KeyLength::Aes128, raw);
        assert!(matches!(result, Err(CredError::Encryption(_))));
    }

    #[test]
    fn test_unaligned_ciphertext_is_decryption_error() {
        let key =
            EncryptionKey::derive(b"master", KeyLength::Aes128, &KeyPolicy::default()).unwrap();
        assert!(matches!(key.decrypt(&[0u8; 15]), Err(CredError::Decryption(_))));
        assert!(matches!(key.decrypt(&[]), Err(CredError::Decryption(_))));
    }

    #[test]
    fn test_key_debug_redacts() {
        let key =
            EncryptionKey::derive(b"master", KeyLength::Aes128, &KeyPolicy::default()).unwrap();
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));
        assert!(debug_output.contains("128"));
    }

    #[test]
    fn test_from_bits() {
        assert_eq!(KeyLength::from_bits(256), Some(KeyLength::Aes256));
        assert_eq!(KeyLength::from_bits(128), Some(KeyLength::Aes128));
        assert_eq!(KeyLength::from_bits(192), None);
    }
}

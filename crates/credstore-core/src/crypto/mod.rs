//! Cryptographic operations for credstore.
//!
//! This module provides key derivation, the multi-key cipher and the master
//! password type:
//! - **PBKDF2-HMAC-SHA1**: derives AES keys from the master password
//! - **AES/ECB/PKCS5Padding**: the storage cipher, kept for compatibility
//!   with records written by earlier releases
//!
//! ## Security Model
//!
//! - The master password lives only in the secure vault
//! - Every derived key and password buffer is zeroized on drop
//! - Each ciphertext is bound to its account prefix ("spice")
//!
//! ## Threat Model
//!
//! We defend against:
//! - Casual reading of the configuration files holding account secrets
//! - Copying a property file to a machine without the vault entry
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Attackers who can read the vault slot
//! - Pattern analysis of ECB ciphertext

pub mod cipher;
pub mod key;
pub mod master;

pub use cipher::MultiKeyCipher;
pub use key::{EncryptionKey, KeyLength, KeyPolicy, ITERATIONS, SALT};
pub use master::{MasterPassword, LEGACY_DEFAULT_PASSWORD, MASTER_PASSWORD_LEN};

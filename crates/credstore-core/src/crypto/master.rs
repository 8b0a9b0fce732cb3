//! Master password handling.

use zeroize::Zeroizing;

use crate::error::{CredError, Result};

/// Length of a generated master password in characters.
pub const MASTER_PASSWORD_LEN: usize = 64;

/// Password used before master passwords existed.
///
/// Only ever used to decrypt records written by those releases.
pub const LEGACY_DEFAULT_PASSWORD: &str = " ";

const ALPHABET: &[u8; 52] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of the alphabet size that fits in a byte.
const REJECTION_LIMIT: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// The root secret every key ring is derived from.
///
/// The backing buffer is zeroized on drop, so every exit path out of a
/// scope holding a `MasterPassword` wipes it.
pub struct MasterPassword {
    value: Zeroizing<String>,
}

impl MasterPassword {
    /// Generate a fresh password of 64 mixed-case ASCII letters.
    ///
    /// # Errors
    ///
    /// Returns `CredError::Encryption` if the OS random source fails.
    pub fn generate() -> Result<Self> {
        let mut value = Zeroizing::new(String::with_capacity(MASTER_PASSWORD_LEN));
        let mut pool = Zeroizing::new([0u8; MASTER_PASSWORD_LEN]);

        while value.len() < MASTER_PASSWORD_LEN {
            getrandom::getrandom(&mut pool[..])
                .map_err(|e| CredError::Encryption(format!("Random source failed: {}", e)))?;
            for byte in pool.iter().copied() {
                if value.len() == MASTER_PASSWORD_LEN {
                    break;
                }
                // Rejection sampling keeps every letter equally likely
                if byte < REJECTION_LIMIT {
                    value.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
                }
            }
        }

        Ok(Self { value })
    }

    /// The implicit password of pre-master-password releases.
    pub fn legacy_default() -> Self {
        Self::from(LEGACY_DEFAULT_PASSWORD.to_string())
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl From<String> for MasterPassword {
    fn from(value: String) -> Self {
        Self {
            value: Zeroizing::new(value),
        }
    }
}

impl std::fmt::Debug for MasterPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterPassword")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_shape() {
        let password = MasterPassword::generate().unwrap();
        assert_eq!(password.len(), MASTER_PASSWORD_LEN);
        assert!(password.expose().chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        let first = MasterPassword::generate().unwrap();
        let second = MasterPassword::generate().unwrap();
        assert_ne!(first.expose(), second.expose());
    }

    #[test]
    fn test_generated_password_mixes_case() {
        // 64 letters drawn uniformly are all one case with probability 2^-63
        let password = MasterPassword::generate().unwrap();
        assert!(password.expose().chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.expose().chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_legacy_default_is_single_space() {
        let password = MasterPassword::legacy_default();
        assert_eq!(password.expose(), " ");
        assert_eq!(password.len(), 1);
    }

    #[test]
    fn test_rejection_limit() {
        assert_eq!(REJECTION_LIMIT, 208);
    }

    #[test]
    fn test_debug_redacts() {
        let password = MasterPassword::from("hunter22".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("hunter22"));
    }
}

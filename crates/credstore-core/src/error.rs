//! Error types for credstore core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer will map these
//! to user-friendly messages. None of them ever carry secret material.

use thiserror::Error;

/// Result type alias for credstore operations.
pub type Result<T> = std::result::Result<T, CredError>;

/// Core error type for credstore operations.
#[derive(Debug, Error)]
pub enum CredError {
    /// Every candidate key length failed to derive or initialize
    #[error("No usable encryption key could be derived")]
    NoUsableKey,

    /// Encryption with the strongest key failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption failed for a reason other than a wrong key
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Padding check failed; expected while probing older key generations
    #[error("Decryption failed with wrong key")]
    WrongKey,

    /// Decrypted value is not bound to the requested account prefix
    #[error("Decrypted value does not belong to prefix {0}")]
    SpiceMismatch(String),

    /// A stored record could not be parsed
    #[error("Malformed record {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// Secure vault backend error
    #[error("Vault error: {0}")]
    Vault(String),

    /// Property store backend error
    #[error("Property store error: {0}")]
    Property(String),

    /// Master password rotation aborted
    #[error("Rotation failed: {0}")]
    Rotation(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl CredError {
    /// Whether this error came from probing a key that did not match.
    pub fn is_wrong_key(&self) -> bool {
        matches!(self, CredError::WrongKey | CredError::SpiceMismatch(_))
    }
}

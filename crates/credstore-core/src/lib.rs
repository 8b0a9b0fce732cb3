//! # Credstore Core
//!
//! Core library for credstore - encrypted per-account secrets bound to a
//! master password held in the OS secure vault.
//!
//! This crate provides key derivation, the scoped credential stores and
//! their storage abstractions independent of the CLI interface.
//!
//! ## Architecture
//!
//! - **crypto**: Key derivation, key ring cipher, master password generation
//! - **vault**: Secure vault trait and backends (keychain, keyfile, memory)
//! - **props**: Property store trait and backends (JSON file, memory)
//! - **store**: Scoped credential store (bootstrap, migration, rotation)
//! - **facade**: Global and user scopes with pre-activation buffering

pub mod crypto;
pub mod error;
pub mod facade;
pub mod fs;
pub mod props;
pub mod store;
pub mod vault;

pub use crypto::{KeyLength, KeyPolicy, MasterPassword, MultiKeyCipher};
pub use error::{CredError, Result};
pub use facade::{CredentialsFacade, FlushReport};
pub use props::PropertyStore;
pub use store::{MigrationReport, RecordKind, Scope, ScopedCredentialStore, StoreState};
pub use vault::{SecretStore, SharedVault, VaultSlot};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

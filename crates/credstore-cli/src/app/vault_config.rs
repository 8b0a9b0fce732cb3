//! Vault backend selection.

use std::path::PathBuf;

use credstore_core::vault::{KeychainVault, KeyfileVault, SharedVault};

use crate::config::{default_keyfile_path, CredstoreConfig, VaultBackend};

/// Keyfile location from the config, or the default one.
pub fn resolve_keyfile_path(config: &CredstoreConfig) -> anyhow::Result<PathBuf> {
    match config.vault.keyfile_path.as_deref() {
        Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => default_keyfile_path(),
    }
}

/// Open the configured vault backend.
pub fn open_vault(config: &CredstoreConfig) -> anyhow::Result<SharedVault> {
    let vault = match config.vault.backend {
        VaultBackend::Keychain => SharedVault::new(KeychainVault::new()),
        VaultBackend::Keyfile => SharedVault::new(KeyfileVault::new(resolve_keyfile_path(config)?)),
    };
    tracing::debug!(backend = vault.backend_name(), "vault opened");
    Ok(vault)
}

/// Warning message for the keyfile vault backend.
pub fn keyfile_warning() -> &'static str {
    "WARNING: You selected the keyfile vault. This stores master passwords unencrypted on disk.\nIf your device is compromised, every stored secret can be decrypted."
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_keyfile_warning_copy() {
        let warning = keyfile_warning();
        assert!(warning.contains("keyfile"));
        assert!(warning.contains("unencrypted on disk"));
    }

    #[test]
    fn test_keyfile_path_override() {
        let dir = tempdir().unwrap();
        let keyfile = dir.path().join("vault.json");
        let config = CredstoreConfig::new(
            "alice".to_string(),
            dir.path().join("global.json"),
            dir.path().join("users"),
            VaultBackend::Keyfile,
            Some(keyfile.clone()),
            256,
        );

        assert_eq!(resolve_keyfile_path(&config).unwrap(), keyfile);
        assert_eq!(open_vault(&config).unwrap().backend_name(), "keyfile");
    }
}

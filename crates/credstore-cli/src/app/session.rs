//! Vault, property files and scopes for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use credstore_core::props::JsonFilePropertyStore;
use credstore_core::{CredentialsFacade, Scope, ScopedCredentialStore, SharedVault, VaultSlot};
use tracing::debug;

use crate::config::CredstoreConfig;
use crate::errors::CliError;

use super::vault_config::open_vault;

pub struct Session {
    vault: Arc<SharedVault>,
    facade: CredentialsFacade,
    global_path: PathBuf,
    user_path: Option<PathBuf>,
}

/// Build the facade for `config`; `user` activates the user scope.
pub fn open_session(config: &CredstoreConfig, user: Option<&str>) -> anyhow::Result<Session> {
    let vault = Arc::new(open_vault(config)?);
    let global_path = PathBuf::from(&config.store.global_path);
    let global_props = open_props(&global_path)?;
    let facade = CredentialsFacade::new(
        vault.clone(),
        VaultSlot::global(&config.identity.user),
        Arc::new(global_props),
        config.key_policy(),
    );

    let user_path = match user {
        Some(identity) => {
            validate_identity(identity)?;
            let path = config.user_props_path(identity);
            let props = open_props(&path)?;
            let report = facade.activate_user(VaultSlot::for_identity(identity), Arc::new(props));
            debug!(identity, created = report.created, "user scope ready");
            Some(path)
        }
        None => None,
    };

    Ok(Session {
        vault,
        facade,
        global_path,
        user_path,
    })
}

impl Session {
    pub fn facade(&self) -> &CredentialsFacade {
        &self.facade
    }

    pub fn vault(&self) -> &SharedVault {
        &self.vault
    }

    /// The store of `scope`; the user scope needs `--user`.
    pub fn store(&self, scope: Scope) -> anyhow::Result<&ScopedCredentialStore> {
        self.facade.store(scope).ok_or_else(|| {
            CliError::invalid_input("The user scope needs --user <IDENTITY>").into()
        })
    }

    /// Property file backing `scope`, if that scope is active.
    pub fn props_path(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::Global => Some(self.global_path.as_path()),
            Scope::User => self.user_path.as_deref(),
        }
    }
}

fn open_props(path: &Path) -> anyhow::Result<JsonFilePropertyStore> {
    JsonFilePropertyStore::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open property file {}: {}", path.display(), e))
}

fn validate_identity(identity: &str) -> anyhow::Result<()> {
    let valid = !identity.trim().is_empty()
        && identity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'));
    if !valid || identity.starts_with('.') {
        return Err(CliError::invalid_input(format!(
            "Invalid identity \"{}\" (use letters, digits, '.', '_', '-', '@')",
            identity
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_validation() {
        assert!(validate_identity("alice").is_ok());
        assert!(validate_identity("alice@example.org").is_ok());
        assert!(validate_identity("").is_err());
        assert!(validate_identity("../etc").is_err());
        assert!(validate_identity("a/b").is_err());
        assert!(validate_identity(".hidden").is_err());
    }
}

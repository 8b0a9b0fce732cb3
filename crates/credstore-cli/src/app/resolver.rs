//! Path resolution for the config file.

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{default_config_path, read_config, CredstoreConfig};
use crate::errors::CliError;

/// Resolve the config file path; `--config` (or CREDSTORE_CONFIG) wins.
pub fn resolve_config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(value) = cli.config.as_deref() {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Error message when the config file is missing.
pub fn missing_config_message(config_path: &Path) -> String {
    format!("No credstore config found at {}", config_path.display())
}

/// Load the config file, failing with a not-found error when it is missing.
pub fn load_config(cli: &Cli) -> anyhow::Result<CredstoreConfig> {
    let config_path = resolve_config_path(cli)?;
    if !config_path.exists() {
        return Err(CliError::not_found(
            missing_config_message(&config_path),
            "Hint: Run `credstore init` first, or point CREDSTORE_CONFIG at an existing config.",
        )
        .into());
    }
    read_config(&config_path)
}

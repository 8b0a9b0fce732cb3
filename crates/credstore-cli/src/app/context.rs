//! Application context for the credstore CLI.
//!
//! Provides a unified context that combines CLI arguments with the
//! lazily-loaded config file.

use once_cell::unsync::OnceCell;

use crate::cli::Cli;
use crate::config::CredstoreConfig;

use super::resolver::load_config;
use super::session::{open_session, Session};

/// Application context that bundles CLI args with the config.
pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<CredstoreConfig>,
}

impl<'a> AppContext<'a> {
    /// Create a new application context from CLI arguments.
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    /// Get the CLI arguments.
    pub fn cli(&self) -> &Cli {
        self.cli
    }

    /// Check if quiet mode is enabled.
    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Get the config, loading it lazily if needed.
    pub fn config(&self) -> anyhow::Result<&CredstoreConfig> {
        self.config.get_or_try_init(|| load_config(self.cli))
    }

    /// Open the vault and scopes described by the config, activating the
    /// user scope when `--user` was given.
    pub fn open_session(&self) -> anyhow::Result<Session> {
        open_session(self.config()?, self.cli.user.as_deref())
    }
}

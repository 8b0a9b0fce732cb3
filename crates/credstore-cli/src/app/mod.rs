//! Application-level utilities for the credstore CLI.
//!
//! This module provides:
//! - Path resolution for the config file
//! - Vault backend selection
//! - Session setup wiring the vault, property files and scopes together

mod context;
mod resolver;
mod session;
mod vault_config;

// Re-export public API
pub use context::AppContext;
pub use resolver::resolve_config_path;
pub use session::{open_session, Session};
pub use vault_config::keyfile_warning;

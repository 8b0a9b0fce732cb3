//! Log output for the CLI.
//!
//! Logs go to stderr so secrets printed by `load` stay alone on stdout.

use tracing_subscriber::EnvFilter;

use crate::constants::env;

/// Default filter for a `-v` count.
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. CREDSTORE_LOG overrides the verbosity flags.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(env::LOG)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Resource not found (config, record).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Encryption, decryption, vault or rotation failure.
    pub const CRYPTO_FAILED: i32 = 5;
}

/// Environment variables read by the CLI.
pub mod env {
    /// Log filter override, in `tracing_subscriber::EnvFilter` syntax.
    pub const LOG: &str = "CREDSTORE_LOG";

    /// Secret for `store`, used instead of prompting.
    pub const SECRET: &str = "CREDSTORE_SECRET";
}

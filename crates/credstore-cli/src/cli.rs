use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use credstore_core::{Scope, VERSION};

/// Credstore - encrypted account secrets bound to a vault-held master password
#[derive(Parser)]
#[command(name = "credstore")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, env = "CREDSTORE_CONFIG")]
    pub config: Option<String>,

    /// Activate the user scope for this profile identity
    #[arg(short, long, global = true, value_name = "IDENTITY")]
    pub user: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the config file and create the global master password
    Init(InitArgs),

    /// Encrypt and store an account secret
    Store(StoreArgs),

    /// Print a stored account secret
    Load(PrefixArgs),

    /// Delete a stored account secret
    Remove(PrefixArgs),

    /// List stored credential records
    List(ListArgs),

    /// Migrate legacy plaintext records
    Migrate(ScopeArgs),

    /// Replace the master password and re-encrypt every record
    Rotate(ScopeArgs),

    /// Show vault, scope and key policy status
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Credential scope selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    #[default]
    Global,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Global => Scope::Global,
            ScopeArg::User => Scope::User,
        }
    }
}

/// Vault backend selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Keychain,
    Keyfile,
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Installation identity naming the global vault slot (defaults to $USER)
    #[arg(long)]
    pub identity: Option<String>,

    /// Where master passwords are kept
    #[arg(long, value_enum, default_value_t = BackendArg::Keychain)]
    pub backend: BackendArg,

    /// Keyfile path override (keyfile backend only)
    #[arg(long)]
    pub keyfile_path: Option<String>,

    /// Largest AES key length the host may use
    #[arg(long, default_value_t = 256)]
    pub max_key_bits: u32,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Delete the master passwords of the global slot (and the --user slot)
    #[arg(long)]
    pub reset: bool,
}

#[derive(Args)]
pub struct ScopeArgs {
    /// Credential scope
    #[arg(long, value_enum, default_value_t = ScopeArg::Global)]
    pub scope: ScopeArg,
}

/// Arguments for the `load` and `remove` commands
#[derive(Args)]
pub struct PrefixArgs {
    /// Account prefix
    #[arg(value_name = "PREFIX")]
    pub prefix: String,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Arguments for the `store` command
#[derive(Args)]
pub struct StoreArgs {
    /// Account prefix
    #[arg(value_name = "PREFIX")]
    pub prefix: String,

    /// Read the secret from stdin instead of prompting
    #[arg(long)]
    pub stdin: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `status` command
#[derive(Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scope_defaults_to_global() {
        let cli = Cli::try_parse_from(["credstore", "load", "acct1"]).unwrap();
        match cli.command {
            Some(Commands::Load(args)) => {
                assert_eq!(args.prefix, "acct1");
                assert_eq!(args.scope.scope, ScopeArg::Global);
            }
            _ => panic!("expected load command"),
        }
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["credstore", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}

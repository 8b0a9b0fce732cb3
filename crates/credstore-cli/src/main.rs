//! Credstore CLI - encrypted account secrets bound to a vault-held master password
//!
//! This is the command-line interface for credstore. It exposes the core
//! credential operations for headless administration and scripting.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod logging;

use clap::Parser;
use credstore_core::VERSION;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::commands::{init, maintenance, misc, secrets};
use crate::errors::CliError;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let ctx = AppContext::new(&cli);

    if let Err(e) = run(&ctx, &cli) {
        if let Some(cli_error) = e.downcast_ref::<CliError>() {
            cli_error.exit();
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(ctx: &AppContext, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Init(args)) => {
            init::handle_init(ctx, args)?;
        }
        Some(Commands::Store(args)) => {
            secrets::handle_store(ctx, args)?;
        }
        Some(Commands::Load(args)) => {
            secrets::handle_load(ctx, args)?;
        }
        Some(Commands::Remove(args)) => {
            secrets::handle_remove(ctx, args)?;
        }
        Some(Commands::List(args)) => {
            secrets::handle_list(ctx, args)?;
        }
        Some(Commands::Migrate(args)) => {
            maintenance::handle_migrate(ctx, args)?;
        }
        Some(Commands::Rotate(args)) => {
            maintenance::handle_rotate(ctx, args)?;
        }
        Some(Commands::Status(args)) => {
            maintenance::handle_status(ctx, args)?;
        }
        Some(Commands::Completions(args)) => {
            misc::handle_completions(args)?;
        }
        None => {
            println!("credstore v{}", VERSION);
            println!("\nRun `credstore --help` for usage information.");
        }
    }

    Ok(())
}

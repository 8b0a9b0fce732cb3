use std::io::IsTerminal;
use std::path::PathBuf;

use dialoguer::Confirm;

use credstore_core::{KeyLength, MigrationReport, RecordKind, Scope, ScopedCredentialStore};

use crate::app::{keyfile_warning, open_session, resolve_config_path, AppContext, Session};
use crate::cli::{BackendArg, InitArgs};
use crate::config::{
    default_global_path, default_identity, default_keyfile_path, default_user_dir, read_config,
    write_config, CredstoreConfig, VaultBackend,
};
use crate::errors::CliError;

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let config_path = resolve_config_path(ctx.cli())?;
    let interactive = std::io::stdin().is_terminal() && !ctx.quiet();

    let config = if config_path.exists() && !args.force {
        if !args.reset {
            return Err(CliError::invalid_input(format!(
                "Config already exists at {}\nHint: Pass --force to overwrite it, or --reset to delete its master passwords.",
                config_path.display()
            ))
            .into());
        }
        read_config(&config_path)?
    } else {
        let config = build_config(args)?;
        if config.vault.backend == VaultBackend::Keyfile && !ctx.quiet() {
            eprintln!("{}", keyfile_warning());
            if interactive && !confirm("Continue?", false)? {
                return Err(anyhow::anyhow!("Init cancelled"));
            }
        }
        write_config(&config_path, &config)?;
        config
    };

    let session = open_session(&config, ctx.cli().user.as_deref())?;
    if args.reset {
        reset_scopes(ctx, &session, interactive)?;
    }

    let mut report = MigrationReport::default();
    for scope in [Scope::Global, Scope::User] {
        if let Some(store) = session.facade().store(scope) {
            let scope_report = store
                .migrate_legacy_plaintext()
                .map_err(|e| CliError::from_core("Failed to create master password", e))?;
            report.absorb(scope_report);
        }
    }

    if !ctx.quiet() {
        println!("Initialized credstore at {}", config_path.display());
        println!("Vault backend: {}", config.vault.backend.as_str());
        println!("Global vault slot: {}", session.facade().global().slot());
        if let Some(user) = session.facade().user() {
            println!("User vault slot: {}", user.slot());
        }
        if !report.is_noop() {
            println!("Migrated {} legacy record(s)", report.migrated);
        }
    }
    Ok(())
}

fn build_config(args: &InitArgs) -> anyhow::Result<CredstoreConfig> {
    if KeyLength::CANDIDATES
        .iter()
        .all(|length| length.bits() > args.max_key_bits)
    {
        return Err(CliError::invalid_input(format!(
            "--max-key-bits {} allows no key length (minimum is 128)",
            args.max_key_bits
        ))
        .into());
    }

    let identity = match args.identity.as_deref() {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        Some(_) => return Err(CliError::invalid_input("--identity cannot be empty").into()),
        None => default_identity(),
    };

    let (backend, keyfile_path) = match args.backend {
        BackendArg::Keychain => (VaultBackend::Keychain, None),
        BackendArg::Keyfile => {
            let path = match args.keyfile_path.as_deref() {
                Some(path) => PathBuf::from(path),
                None => default_keyfile_path()?,
            };
            (VaultBackend::Keyfile, Some(path))
        }
    };

    Ok(CredstoreConfig::new(
        identity,
        default_global_path()?,
        default_user_dir()?,
        backend,
        keyfile_path,
        args.max_key_bits,
    ))
}

/// Delete each active scope's master password together with the records
/// encrypted under it.
fn reset_scopes(ctx: &AppContext, session: &Session, interactive: bool) -> anyhow::Result<()> {
    let stores: Vec<&ScopedCredentialStore> = [Scope::Global, Scope::User]
        .into_iter()
        .filter_map(|scope| session.facade().store(scope))
        .collect();

    if interactive {
        let names: Vec<String> = stores.iter().map(|store| store.slot().to_string()).collect();
        let prompt = format!(
            "Delete master password(s) {} and every secret encrypted under them?",
            names.join(", ")
        );
        if !confirm(&prompt, false)? {
            return Err(anyhow::anyhow!("Reset cancelled"));
        }
    }

    for store in stores {
        let records = store
            .list_records()
            .map_err(|e| CliError::from_core("Failed to list records", e))?;
        let mut purged = 0;
        for record in records.iter().filter(|r| r.kind == RecordKind::Encrypted) {
            store.remove_password(&record.prefix);
            purged += 1;
        }
        session
            .vault()
            .lock()
            .delete(store.slot())
            .map_err(|e| CliError::from_core("Failed to delete master password", e))?;
        if !ctx.quiet() {
            println!(
                "Deleted master password {} and {} encrypted record(s)",
                store.slot(),
                purged
            );
        }
    }
    Ok(())
}

fn confirm(prompt: &str, default: bool) -> anyhow::Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read confirmation: {}", e))
}

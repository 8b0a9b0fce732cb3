use std::io::{self, IsTerminal, Read};

use comfy_table::{presets, ContentArrangement, Table};
use dialoguer::Password;
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use credstore_core::Scope;

use crate::app::AppContext;
use crate::cli::{ListArgs, PrefixArgs, StoreArgs};
use crate::constants::env;
use crate::errors::CliError;

pub fn handle_store(ctx: &AppContext, args: &StoreArgs) -> anyhow::Result<()> {
    let session = ctx.open_session()?;
    let scope = Scope::from(args.scope.scope);
    let store = session.store(scope)?;

    let secret = read_secret(args.stdin)?;
    if !store.store_password(&args.prefix, Some(secret.as_str())) {
        return Err(CliError::crypto_failed(format!(
            "Failed to store secret for {}",
            args.prefix
        ))
        .into());
    }

    if !ctx.quiet() {
        println!("Stored {} in the {} scope", args.prefix, scope);
    }
    Ok(())
}

pub fn handle_load(ctx: &AppContext, args: &PrefixArgs) -> anyhow::Result<()> {
    let session = ctx.open_session()?;
    let store = session.store(args.scope.scope.into())?;

    match store.load_password(&args.prefix) {
        Some(secret) => {
            println!("{}", secret.expose_secret());
            Ok(())
        }
        None if store.is_encrypted(&args.prefix) => Err(CliError::crypto_failed(format!(
            "Secret for {} could not be decrypted",
            args.prefix
        ))
        .into()),
        None => Err(CliError::not_found(
            format!("No secret stored for {}", args.prefix),
            "Hint: Run `credstore list` to see stored prefixes.",
        )
        .into()),
    }
}

pub fn handle_remove(ctx: &AppContext, args: &PrefixArgs) -> anyhow::Result<()> {
    let session = ctx.open_session()?;
    let store = session.store(args.scope.scope.into())?;

    let existed = store.is_encrypted(&args.prefix);
    store.remove_password(&args.prefix);

    if !ctx.quiet() {
        if existed {
            println!("Removed {}", args.prefix);
        } else {
            println!("Nothing stored for {}", args.prefix);
        }
    }
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &ListArgs) -> anyhow::Result<()> {
    let session = ctx.open_session()?;
    let store = session.store(args.scope.scope.into())?;
    let records = store
        .list_records()
        .map_err(|e| CliError::from_core("Failed to list records", e))?;

    if args.json {
        let values: Vec<serde_json::Value> = records
            .iter()
            .map(|record| {
                serde_json::json!({
                    "prefix": record.prefix,
                    "kind": record.kind.as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    if records.is_empty() {
        if !ctx.quiet() {
            println!("No records.");
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if !ctx.quiet() {
        table.set_header(vec!["PREFIX", "KIND"]);
    }
    for record in &records {
        table.add_row(vec![record.prefix.as_str(), record.kind.as_str()]);
    }
    println!("{}", table);
    Ok(())
}

/// Secret for `store`: stdin, CREDSTORE_SECRET, or a hidden prompt.
fn read_secret(from_stdin: bool) -> anyhow::Result<Zeroizing<String>> {
    let secret = if from_stdin {
        let mut buffer = Zeroizing::new(String::new());
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
        Zeroizing::new(buffer.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string())
    } else if let Some(value) = std::env::var(env::SECRET).ok().filter(|v| !v.is_empty()) {
        Zeroizing::new(value)
    } else if io::stdin().is_terminal() {
        Password::new()
            .with_prompt("Secret")
            .with_confirmation("Confirm secret", "Secrets do not match")
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| anyhow::anyhow!("Failed to read secret: {}", e))?
    } else {
        return Err(CliError::invalid_input(format!(
            "No secret provided; pass --stdin or set {}",
            env::SECRET
        ))
        .into());
    };

    if secret.is_empty() {
        return Err(CliError::invalid_input("Secret cannot be empty").into());
    }
    Ok(secret)
}

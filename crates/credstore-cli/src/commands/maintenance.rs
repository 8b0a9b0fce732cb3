use comfy_table::{presets, ContentArrangement, Table};

use credstore_core::{KeyLength, RecordKind, Scope, ScopedCredentialStore};

use crate::app::{resolve_config_path, AppContext, Session};
use crate::cli::{ScopeArgs, StatusArgs};
use crate::errors::CliError;

pub fn handle_migrate(ctx: &AppContext, args: &ScopeArgs) -> anyhow::Result<()> {
    let session = ctx.open_session()?;
    let scope = Scope::from(args.scope);
    let report = session
        .store(scope)?
        .migrate_legacy_plaintext()
        .map_err(|e| CliError::from_core("Migration failed", e))?;

    if !ctx.quiet() {
        println!(
            "Migrated {}, discarded {}, failed {} legacy record(s) in the {} scope",
            report.migrated, report.discarded, report.failed, scope
        );
    }
    if report.failed > 0 {
        return Err(CliError::crypto_failed(format!(
            "{} legacy record(s) could not be migrated",
            report.failed
        ))
        .into());
    }
    Ok(())
}

pub fn handle_rotate(ctx: &AppContext, args: &ScopeArgs) -> anyhow::Result<()> {
    let session = ctx.open_session()?;
    let scope = Scope::from(args.scope);
    session
        .facade()
        .rotate_master_password(scope)
        .map_err(|e| CliError::from_core("Rotation failed", e))?;

    if !ctx.quiet() {
        let store = session.store(scope)?;
        println!("Rotated master password {} ({} scope)", store.slot(), scope);
    }
    Ok(())
}

struct ScopeStatus {
    scope: Scope,
    slot: String,
    master_password: &'static str,
    props_path: String,
    encrypted: usize,
    legacy: usize,
}

pub fn handle_status(ctx: &AppContext, args: &StatusArgs) -> anyhow::Result<()> {
    let config_path = resolve_config_path(ctx.cli())?;
    let config = ctx.config()?;
    let session = ctx.open_session()?;
    let policy = config.key_policy();
    let key_bits: Vec<u32> = KeyLength::CANDIDATES
        .iter()
        .filter(|length| policy.allows(**length))
        .map(|length| length.bits())
        .collect();

    let scopes: Vec<ScopeStatus> = [Scope::Global, Scope::User]
        .into_iter()
        .filter_map(|scope| session.facade().store(scope).map(|store| (scope, store)))
        .map(|(scope, store)| scope_status(&session, scope, store))
        .collect::<anyhow::Result<_>>()?;

    if args.json {
        let scope_values: Vec<serde_json::Value> = scopes
            .iter()
            .map(|status| {
                serde_json::json!({
                    "scope": status.scope.as_str(),
                    "slot": status.slot,
                    "master_password": status.master_password,
                    "props_path": status.props_path,
                    "encrypted": status.encrypted,
                    "legacy": status.legacy,
                })
            })
            .collect();
        let output = serde_json::json!({
            "config_path": config_path.to_string_lossy(),
            "vault_backend": session.vault().backend_name(),
            "max_key_bits": policy.max_key_bits,
            "key_lengths": key_bits,
            "scopes": scope_values,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let key_list: Vec<String> = key_bits.iter().map(|bits| bits.to_string()).collect();
    let mut summary = Table::new();
    summary.load_preset(presets::NOTHING);
    summary.add_row(vec!["Config".to_string(), config_path.display().to_string()]);
    summary.add_row(vec![
        "Vault backend".to_string(),
        session.vault().backend_name().to_string(),
    ]);
    summary.add_row(vec![
        "Key lengths".to_string(),
        if key_list.is_empty() {
            "none".to_string()
        } else {
            key_list.join(", ")
        },
    ]);
    println!("{}", summary);
    println!();

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["SCOPE", "SLOT", "MASTER", "ENCRYPTED", "LEGACY", "FILE"]);
    for status in &scopes {
        table.add_row(vec![
            status.scope.as_str().to_string(),
            status.slot.clone(),
            status.master_password.to_string(),
            status.encrypted.to_string(),
            status.legacy.to_string(),
            status.props_path.clone(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn scope_status(
    session: &Session,
    scope: Scope,
    store: &ScopedCredentialStore,
) -> anyhow::Result<ScopeStatus> {
    let master_password = match session.vault().lock().get(store.slot()) {
        Ok(Some(_)) => "present",
        Ok(None) => "absent",
        Err(err) => {
            tracing::warn!(%scope, error = %err, "vault read failed");
            "unreadable"
        }
    };
    let records = store
        .list_records()
        .map_err(|e| CliError::from_core("Failed to list records", e))?;
    let encrypted = records
        .iter()
        .filter(|record| record.kind == RecordKind::Encrypted)
        .count();

    Ok(ScopeStatus {
        scope,
        slot: store.slot().to_string(),
        master_password,
        props_path: session
            .props_path(scope)
            .map(|path| path.display().to_string())
            .unwrap_or_default(),
        encrypted,
        legacy: records.len() - encrypted,
    })
}

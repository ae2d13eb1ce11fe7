//! Maps parsed arguments onto secret store client calls
//!
//! Command output (secret values included) goes to stdout only; logs go
//! to stderr through tracing and never carry payload values.

#![allow(clippy::print_stdout)]

use crate::cli::{AuthKind, Cli, CliError, Commands, KvCommands, OkEnvelope};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use vaultkit_client::{AuthMethod, VaultClient, WriteMode};
use vaultkit_core::retry::with_retry;
use vaultkit_core::{RetryConfig, SecretBundle, SecretMetadata};

/// Execute the parsed command line end to end: authenticate, run the
/// selected operation, and print its output.
pub async fn execute(cli: Cli) -> Result<(), CliError> {
    let Cli {
        command,
        address,
        engine,
        auth,
        role_id,
        secret_id,
        username,
        password,
        retries,
        json,
        ..
    } = cli;

    let Some(Commands::Kv { subcommand }) = command else {
        return Err(CliError::usage_with_help(
            "no subcommand provided",
            "Run 'vaultkit --help' for usage information",
        ));
    };
    let Some(address) = address else {
        return Err(CliError::usage_with_help(
            "no server address given",
            "Pass --address or set VAULT_ADDR",
        ));
    };

    // Argument mistakes are rejected before any network traffic
    if let KvCommands::Get {
        field_only: true,
        key: None,
        ..
    } = &subcommand
    {
        return Err(CliError::usage_with_help(
            "--field-only requires --key",
            "Name the key whose value should be printed",
        ));
    }
    let payload = match &subcommand {
        KvCommands::Put { entries, .. } => parse_entries(entries)?,
        _ => BTreeMap::new(),
    };

    let method = auth_method(auth, role_id, secret_id, username, password)?;
    let mut client = VaultClient::new(&address)?;
    client.login(&method).await?;

    // Total attempts for idempotent reads; writes never retry
    let retry = RetryConfig::with_max_attempts(retries.saturating_add(1));
    debug!(engine, retries, "dispatching kv command");

    match subcommand {
        KvCommands::List { folder } => {
            let names = with_retry(&retry, || client.list(&engine, folder.as_deref())).await?;
            render_names(&names, json)
        }
        KvCommands::Subkeys { path } => {
            let names = with_retry(&retry, || client.subkeys(&engine, &path)).await?;
            render_names(&names, json)
        }
        KvCommands::Get {
            path,
            key,
            version,
            field_only,
        } => {
            let bundle = match &key {
                Some(key) => {
                    with_retry(&retry, || client.read_key(&engine, &path, key, version)).await?
                }
                None => with_retry(&retry, || client.read(&engine, &path, version)).await?,
            };
            render_bundle(&bundle, field_only, json)
        }
        KvCommands::Put {
            path, replace, cas, ..
        } => {
            let bundle = match cas {
                Some(expected) => client.write_cas(&engine, &path, payload, expected).await?,
                None => {
                    let mode = if replace {
                        WriteMode::Replace
                    } else {
                        WriteMode::Merge
                    };
                    client.write(&engine, &path, payload, mode).await?
                }
            };
            render_write(&engine, &path, &bundle, json)
        }
        KvCommands::Delete { path, key } => {
            match &key {
                Some(key) => client.delete_key(&engine, &path, key).await?,
                None => client.delete(&engine, &path).await?,
            }
            render_delete(&engine, &path, key.as_deref(), json)
        }
        KvCommands::Metadata { path } => {
            let metadata = with_retry(&retry, || client.metadata(&engine, &path)).await?;
            render_metadata(&metadata, json)
        }
    }
}

/// Assemble the auth method from the selection flag and its credentials
fn auth_method(
    auth: AuthKind,
    role_id: Option<String>,
    secret_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<AuthMethod, CliError> {
    match auth {
        AuthKind::Approle => {
            let role_id = role_id.ok_or_else(|| {
                CliError::usage_with_help(
                    "approle auth needs a role ID",
                    "Pass --role-id or set VAULT_ROLE_ID",
                )
            })?;
            let secret_id = secret_id.ok_or_else(|| {
                CliError::usage_with_help(
                    "approle auth needs a secret ID",
                    "Pass --secret-id or set VAULT_SECRET_ID",
                )
            })?;
            Ok(AuthMethod::app_role(role_id, secret_id))
        }
        AuthKind::Ldap => {
            let username = username.ok_or_else(|| {
                CliError::usage_with_help(
                    "ldap auth needs a username",
                    "Pass --username or set VAULT_LDAP_USERNAME",
                )
            })?;
            let password = password.ok_or_else(|| {
                CliError::usage_with_help(
                    "ldap auth needs a password",
                    "Pass --password or set VAULT_LDAP_PASSWORD",
                )
            })?;
            Ok(AuthMethod::ldap(username, password))
        }
    }
}

/// Parse `KEY=VALUE` arguments into a write payload. Later duplicates
/// of a key win, matching the merge rule.
fn parse_entries(entries: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    let mut data = BTreeMap::new();
    for entry in entries {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(CliError::usage_with_help(
                format!("'{entry}' is not a KEY=VALUE pair"),
                "Write entries as KEY=VALUE, for example svc_deploy=s3cr3t",
            ));
        };
        if key.trim().is_empty() {
            return Err(CliError::usage(format!("'{entry}' has an empty key")));
        }
        data.insert(key.to_string(), value.to_string());
    }
    Ok(data)
}

fn render_ok<T: Serialize>(data: &T) -> Result<(), CliError> {
    let envelope = OkEnvelope::new(data);
    match serde_json::to_string(&envelope) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => Err(CliError::operation(format!(
            "JSON serialization failed: {e}"
        ))),
    }
}

fn render_names(names: &[String], json_mode: bool) -> Result<(), CliError> {
    if json_mode {
        return render_ok(&serde_json::json!({ "names": names }));
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn render_bundle(
    bundle: &SecretBundle,
    field_only: bool,
    json_mode: bool,
) -> Result<(), CliError> {
    if field_only {
        // A --key read holds exactly one entry
        for value in bundle.data.values() {
            println!("{value}");
        }
        return Ok(());
    }
    if json_mode {
        return render_ok(bundle);
    }
    for (key, value) in &bundle.data {
        println!("{key}={value}");
    }
    Ok(())
}

fn render_write(
    engine: &str,
    path: &str,
    bundle: &SecretBundle,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        // Echo key names and the new version, never the values
        return render_ok(&serde_json::json!({
            "path": format!("{engine}/{path}"),
            "version": bundle.metadata.version,
            "keys": bundle.keys().collect::<Vec<_>>(),
        }));
    }
    println!(
        "Wrote {engine}/{path} (version {})",
        bundle.metadata.version
    );
    Ok(())
}

fn render_delete(
    engine: &str,
    path: &str,
    key: Option<&str>,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        return render_ok(&serde_json::json!({
            "path": format!("{engine}/{path}"),
            "key": key,
        }));
    }
    match key {
        Some(key) => println!("Deleted key '{key}' from {engine}/{path}"),
        None => println!("Deleted {engine}/{path}"),
    }
    Ok(())
}

fn render_metadata(metadata: &SecretMetadata, json_mode: bool) -> Result<(), CliError> {
    if json_mode {
        return render_ok(metadata);
    }
    println!("current version: {}", metadata.current_version);
    println!("created:         {}", metadata.created_time.to_rfc3339());
    println!("updated:         {}", metadata.updated_time.to_rfc3339());
    println!("versions:");
    for version in &metadata.versions {
        let mut line = format!(
            "  {:>4}  created {}",
            version.version,
            version.created_time.to_rfc3339()
        );
        if let Some(deleted) = version.deletion_time {
            line.push_str(&format!(", deleted {}", deleted.to_rfc3339()));
        }
        if version.destroyed {
            line.push_str(", destroyed");
        }
        println!("{line}");
    }
    Ok(())
}

//! CLI account command handlers.

use serde::Serialize;

use super::{CliContext, JsonArgs, SetArgs};
use crate::auth::AccountToken;
use crate::config::Bc4Config;
use crate::error::Result;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct AccountSummary {
    id: String,
    name: String,
    default: bool,
}

/// Handle `bc4 account list [--json]`.
pub fn handle_list(ctx: &CliContext, args: &JsonArgs) -> Result<()> {
    let client = ctx.offline_auth_client();
    let accounts = client.get_accounts()?;
    let default = client.get_default_account()?;
    let summaries = summarize(accounts.values(), default.as_deref());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("No authenticated accounts found.");
        return Ok(());
    }
    for summary in &summaries {
        let marker = if summary.default { "*" } else { " " };
        println!("{marker} {:<12} {}", summary.id, summary.name);
    }
    Ok(())
}

/// Handle `bc4 account set <ACCOUNT_ID>`.
///
/// Updates the credential file's default and records the choice in
/// `config.json`.
pub fn handle_set(ctx: &CliContext, args: &SetArgs) -> Result<()> {
    let client = ctx.offline_auth_client();
    client.set_default_account(&args.account_id)?;
    let name = client
        .get_accounts()?
        .get(&args.account_id)
        .map(|token| token.account_name.clone())
        .unwrap_or_default();

    let path = ctx.config_path();
    let mut config = Bc4Config::read_file(&path)?;
    let had_project = !config.default_project.is_empty();
    let switched = config.default_account != args.account_id;
    config.select_account(&args.account_id, &name);
    config.save_to_path(&path)?;

    println!("Default account set to: {name} (ID: {})", args.account_id);
    if switched && had_project {
        println!("Note: Default project has been cleared since you changed accounts.");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CurrentAccount {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    default_project: String,
}

/// Handle `bc4 account current [--json]`.
pub fn handle_current(ctx: &CliContext, args: &JsonArgs) -> Result<()> {
    let client = ctx.offline_auth_client();
    let accounts = client.get_accounts()?;
    let id = if ctx.config.default_account.is_empty() {
        client.get_default_account()?
    } else {
        Some(ctx.config.default_account.clone())
    };

    let Some(id) = id else {
        println!("No default account set.");
        return Ok(());
    };

    let name = accounts
        .get(&id)
        .map(|token| token.account_name.clone())
        .or_else(|| ctx.config.accounts.get(&id).map(|acc| acc.name.clone()))
        .unwrap_or_default();
    let default_project = if ctx.config.default_project.is_empty() {
        ctx.config
            .accounts
            .get(&id)
            .map(|acc| acc.default_project.clone())
            .unwrap_or_default()
    } else {
        ctx.config.default_project.clone()
    };
    let current = CurrentAccount {
        id,
        name,
        default_project,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&current)?);
        return Ok(());
    }
    println!("Name: {}", current.name);
    println!("ID: {}", current.id);
    if !current.default_project.is_empty() {
        println!("Default Project: {}", current.default_project);
    }
    Ok(())
}

/// Accounts sorted by name, then id.
fn summarize<'a>(
    tokens: impl IntoIterator<Item = &'a AccountToken>,
    default: Option<&str>,
) -> Vec<AccountSummary> {
    let mut summaries: Vec<AccountSummary> = tokens
        .into_iter()
        .map(|token| AccountSummary {
            id: token.account_id.clone(),
            name: token.account_name.clone(),
            default: Some(token.account_id.as_str()) == default,
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    summaries
}

//! CLI auth command handlers for login, logout, status and refresh.

use std::sync::Arc;

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::{CliContext, LogoutArgs, RefreshArgs};
use crate::auth::{AccountToken, LoginEvent, LoginPhase};
use crate::error::{Bc4Error, Result};

/// Handle `bc4 auth login`.
pub async fn handle_login(ctx: &CliContext, cancel: CancellationToken) -> Result<()> {
    if ctx.is_first_run() && ctx.config.oauth_config().is_err() {
        print!("{}", first_run_notice(&ctx.config_path()));
    }
    let client = ctx
        .auth_client()?
        .with_observer(Arc::new(|event: &LoginEvent| print_login_event(event)));

    println!("Starting authentication flow...");
    let token = client.login(&cancel).await?;
    println!("✓ Successfully authenticated with {}", token.account_name);
    Ok(())
}

fn print_login_event(event: &LoginEvent) {
    match event {
        LoginEvent::BrowserOpened { url } => {
            eprintln!("Opening your browser to authorize bc4.");
            eprintln!("If it does not open, visit:\n  {url}");
        }
        LoginEvent::BrowserUnavailable { url, .. } => {
            eprintln!("Could not open a browser. Visit this URL to continue:\n  {url}");
        }
        LoginEvent::Phase(LoginPhase::AwaitingRedirect) => {
            eprintln!("Waiting for authorization (Ctrl-C to cancel)...");
        }
        LoginEvent::Phase(LoginPhase::Exchanging) => eprintln!("Exchanging authorization code..."),
        LoginEvent::Phase(_) => {}
    }
}

/// Handle `bc4 auth logout [ACCOUNT_ID] [--all]`.
///
/// Without an id or `--all` this logs out of the default account.
pub fn handle_logout(ctx: &CliContext, args: &LogoutArgs) -> Result<()> {
    let client = ctx.offline_auth_client();
    if args.all {
        client.logout(None)?;
        println!("✓ Logged out of all accounts");
        return Ok(());
    }

    let account_id = match &args.account_id {
        Some(id) => id.clone(),
        None => client.get_default_account()?.ok_or_else(|| {
            Bc4Error::InvalidArgument(
                "no default account to log out of; pass an account id or --all".to_string(),
            )
        })?,
    };
    client.logout(Some(&account_id))?;
    println!("✓ Logged out of account {account_id}");
    Ok(())
}

/// Handle `bc4 auth status`.
pub fn handle_status(ctx: &CliContext) -> Result<()> {
    if ctx.is_first_run() && ctx.config.oauth_config().is_err() {
        print!("{}", first_run_notice(&ctx.config_path()));
        return Ok(());
    }
    if ctx.config.oauth_config().is_err() {
        println!("✗ OAuth credentials not configured");
        println!("\nAdd client_id and client_secret to {}", ctx.config_path().display());
        return Ok(());
    }

    let client = ctx.offline_auth_client();
    let accounts = client.get_accounts()?;
    if accounts.is_empty() {
        println!("✗ Not authenticated");
        println!("\nRun 'bc4 auth login' to authenticate");
        return Ok(());
    }

    let default = client.get_default_account()?;
    let tokens: Vec<&AccountToken> = accounts.values().collect();
    print!("{}", render_status(&tokens, default.as_deref(), Utc::now()));
    Ok(())
}

/// Handle `bc4 auth refresh [ACCOUNT_ID]`.
pub async fn handle_refresh(ctx: &CliContext, args: &RefreshArgs) -> Result<()> {
    let client = ctx.auth_client()?;
    let token = client.force_refresh(args.account_id.as_deref()).await?;
    println!("✓ Token refreshed for {}", token.account_name);
    Ok(())
}

fn first_run_notice(config_path: &Path) -> String {
    format!(
        "Welcome to bc4! No configuration found yet.\n\n\
         1. Register an integration at https://launchpad.37signals.com/integrations\n\
         \x20  with redirect URI http://localhost:8888/callback\n\
         2. Add client_id and client_secret to {}\n\
         \x20  (or set BC4_CLIENT_ID and BC4_CLIENT_SECRET)\n\
         3. Run 'bc4 auth login'\n",
        config_path.display()
    )
}

fn render_status(tokens: &[&AccountToken], default: Option<&str>, now: DateTime<Utc>) -> String {
    let mut out = String::from("✓ Authenticated\n\nAccounts:\n");
    for token in tokens {
        let prefix = if Some(token.account_id.as_str()) == default {
            "* "
        } else {
            "  "
        };
        let expiry = if token.expires_at() <= now {
            "expired, refreshes on next use".to_string()
        } else {
            format!("expires {}", token.expires_at().format("%Y-%m-%d %H:%M UTC"))
        };
        out.push_str(&format!(
            "{prefix}{} (ID: {}) - {expiry}\n",
            token.account_name, token.account_id
        ));
    }
    if let Some(default) = default {
        out.push_str(&format!("\nDefault account: {default}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn token(id: &str, name: &str, obtained_at: DateTime<Utc>) -> AccountToken {
        AccountToken {
            account_id: id.to_string(),
            account_name: name.to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            obtained_at,
        }
    }

    #[test]
    fn first_run_notice_points_at_setup() {
        let notice = first_run_notice(Path::new("/home/me/.config/bc4/config.json"));
        assert!(notice.starts_with("Welcome to bc4!"));
        assert!(notice.contains("client_secret to /home/me/.config/bc4/config.json\n"));
        assert!(notice.contains("   with redirect URI http://localhost:8888/callback\n"));
        assert!(notice.ends_with("3. Run 'bc4 auth login'\n"));
    }

    #[test]
    fn status_marks_default_and_expiry() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let acme = token("111", "Acme", now);
        let beta = token("222", "Beta", now - Duration::hours(2));

        let out = render_status(&[&acme, &beta], Some("111"), now);
        assert!(out.contains("* Acme (ID: 111) - expires 2025-03-01 13:00 UTC"));
        assert!(out.contains("  Beta (ID: 222) - expired"));
        assert!(out.ends_with("Default account: 111\n"));
    }
}

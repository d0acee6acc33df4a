//! CLI entry point for bc4.

pub mod account;
pub mod auth;
pub mod errors;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::auth::{AuthClient, FileTokenStore, OAuthConfig};
use crate::config::{self, Bc4Config};
use crate::error::Result;

/// Basecamp command-line client
#[derive(Parser, Debug)]
#[command(name = "bc4", version, about = "Basecamp from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Switch between linked Basecamp accounts
    Account(AccountArgs),
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Authenticate with Basecamp in the browser
    Login,
    /// Remove stored credentials
    Logout(LogoutArgs),
    /// Show authentication status
    Status,
    /// Refresh the access token now
    Refresh(RefreshArgs),
}

/// Arguments for `bc4 auth logout`.
#[derive(Parser, Debug)]
pub struct LogoutArgs {
    /// Account to log out of (defaults to the default account)
    #[arg(conflicts_with = "all")]
    pub account_id: Option<String>,

    /// Log out of every account
    #[arg(long)]
    pub all: bool,
}

/// Arguments for `bc4 auth refresh`.
#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Account to refresh (defaults to the default account)
    pub account_id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommands,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// List linked accounts
    List(JsonArgs),
    /// Set the default account
    Set(SetArgs),
    /// Show the default account
    Current(JsonArgs),
}

#[derive(Parser, Debug)]
pub struct JsonArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    pub account_id: String,
}

/// Paths and settings shared by the command handlers.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config_dir: PathBuf,
    pub config: Bc4Config,
}

impl CliContext {
    pub fn load() -> Result<Self> {
        let config = Bc4Config::load()?;
        Ok(Self {
            config_dir: config::config_dir(),
            config,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        config::config_path(&self.config_dir)
    }

    /// Nothing has been written to the config directory yet.
    pub fn is_first_run(&self) -> bool {
        config::is_first_run(&self.config_dir)
    }

    /// Auth client for commands that talk to Launchpad.
    pub fn auth_client(&self) -> Result<AuthClient> {
        Ok(self.client_with(self.config.oauth_config()?))
    }

    /// Auth client for commands that only read or edit the credential file.
    pub fn offline_auth_client(&self) -> AuthClient {
        self.client_with(
            OAuthConfig::builder()
                .client_id(self.config.client_id.clone())
                .client_secret(self.config.client_secret.clone())
                .build(),
        )
    }

    fn client_with(&self, oauth: OAuthConfig) -> AuthClient {
        let store = FileTokenStore::new(config::auth_path(&self.config_dir));
        AuthClient::new(Arc::new(store), oauth)
    }
}

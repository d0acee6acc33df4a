//! bc4: Basecamp command-line client core
//!
//! Multi-account OAuth2 against 37signals Launchpad: a persistent credential
//! store, transparent token refresh, and a browser login flow that receives
//! the redirect on a loopback listener.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bc4::auth::{AuthClient, FileTokenStore};
//! use bc4::config::{self, Bc4Config};
//!
//! # async fn example() -> bc4::error::Result<()> {
//! let config = Bc4Config::load()?;
//! let store = FileTokenStore::new(config::auth_path(&config::config_dir()));
//! let client = AuthClient::new(Arc::new(store), config.oauth_config()?);
//!
//! let token = client.get_token(None).await?;
//! println!("using {} ({})", token.account_name, token.account_id);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

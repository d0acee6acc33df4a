//! Multi-account OAuth2 for Basecamp: credential storage, token refresh and
//! the browser login flow.

pub mod callback;
pub mod client;
pub mod error;
pub mod flow;
pub mod provider;
pub mod refresh;
pub mod store;
pub mod token;

pub use client::AuthClient;
pub use error::AuthError;
pub use flow::{
    AuthorizationFlow, BrowserLauncher, LoginEvent, LoginObserver, LoginPhase, SystemBrowser,
    LOGIN_TIMEOUT,
};
pub use provider::{BasecampProduct, OAuthConfig};
pub use refresh::TokenRefresher;
pub use store::{CredentialStore, FileTokenStore, TokenStore};
pub use token::{AccountToken, EXPIRY_SAFETY_MARGIN_SECS, MAX_EXPIRES_IN_SECS};

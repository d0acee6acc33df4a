#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bc4::auth::{
    AccountToken, AuthError, BrowserLauncher, CredentialStore, LoginEvent, LoginObserver,
    OAuthConfig, TokenStore,
};
use chrono::{DateTime, Utc};
use reqwest::Url;
use wiremock::MockServer;

pub const TOKEN_PATH: &str = "/authorization/token";
pub const IDENTITY_PATH: &str = "/authorization.json";

#[derive(Default)]
pub struct InMemoryTokenStore {
    credentials: Mutex<CredentialStore>,
    saves: AtomicUsize,
    read_only: bool,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(credentials: CredentialStore) -> Self {
        Self {
            credentials: Mutex::new(credentials),
            ..Self::default()
        }
    }

    /// Every save fails, as on a read-only disk.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> CredentialStore {
        self.credentials.lock().expect("store lock poisoned").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<CredentialStore, AuthError> {
        Ok(self.snapshot())
    }

    fn save(&self, store: &CredentialStore) -> Result<(), AuthError> {
        if self.read_only {
            return Err(AuthError::Storage {
                operation: "save",
                message: "read-only file system".to_string(),
            });
        }
        *self.credentials.lock().expect("store lock poisoned") = store.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects login events for later assertions.
pub fn recording_observer() -> (LoginObserver, Arc<Mutex<Vec<LoginEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let observer: LoginObserver = Arc::new(move |event: &LoginEvent| {
        sink.lock().expect("events lock poisoned").push(event.clone());
    });
    (observer, events)
}

pub fn account_token(id: &str, name: &str, expires_in: i64, obtained_at: DateTime<Utc>) -> AccountToken {
    AccountToken {
        account_id: id.to_string(),
        account_name: name.to_string(),
        access_token: format!("access-{id}"),
        refresh_token: format!("refresh-{id}"),
        token_type: "Bearer".to_string(),
        expires_in,
        obtained_at,
    }
}

/// OAuth settings pointing every endpoint at `server`, with an ephemeral
/// callback port.
pub fn oauth_config(server: &MockServer) -> OAuthConfig {
    oauth_config_on_port(server, 0)
}

pub fn oauth_config_on_port(server: &MockServer, callback_port: u16) -> OAuthConfig {
    OAuthConfig::builder()
        .client_id("test-client")
        .client_secret("test-secret")
        .authorize_url(format!("{}/authorization/new", server.uri()))
        .token_url(format!("{}{TOKEN_PATH}", server.uri()))
        .identity_url(format!("{}{IDENTITY_PATH}", server.uri()))
        .callback_port(callback_port)
        .build()
}

#[derive(Debug, Clone)]
pub enum Redirect {
    Approve { code: String },
    ForgedState,
    Deny,
    /// Never calls back; the login has to time out or be cancelled.
    Ignore,
}

/// Plays the user's browser: reads the consent URL and issues the redirect
/// back to the loopback listener.
pub struct ScriptedBrowser {
    redirect: Redirect,
    opened: Mutex<Vec<String>>,
}

impl ScriptedBrowser {
    pub fn new(redirect: Redirect) -> Arc<Self> {
        Arc::new(Self {
            redirect,
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn approving(code: &str) -> Arc<Self> {
        Self::new(Redirect::Approve {
            code: code.to_string(),
        })
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }
}

impl BrowserLauncher for ScriptedBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(url.to_string());

        let consent = Url::parse(url).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let param = |name: &str| {
            consent
                .query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        };
        let state = param("state");
        let redirect_uri = param("redirect_uri").replace("localhost", "127.0.0.1");

        let mut callback = Url::parse(&redirect_uri)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        match &self.redirect {
            Redirect::Approve { code } => {
                callback
                    .query_pairs_mut()
                    .append_pair("state", &state)
                    .append_pair("code", code);
            }
            Redirect::ForgedState => {
                callback
                    .query_pairs_mut()
                    .append_pair("state", "forged-state")
                    .append_pair("code", "stolen-code");
            }
            Redirect::Deny => {
                callback
                    .query_pairs_mut()
                    .append_pair("state", &state)
                    .append_pair("error", "access_denied");
            }
            Redirect::Ignore => return Ok(()),
        }

        tokio::spawn(async move {
            let _ = reqwest::get(callback).await;
        });
        Ok(())
    }
}

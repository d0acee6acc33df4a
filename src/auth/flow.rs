//! Browser-based authorization-code flow against Launchpad.

use std::io;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::Utc;
use rand::RngCore;
use serde::Deserialize;
use strum::Display;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::callback::{CallbackOutcome, CallbackServer};
use super::error::AuthError;
use super::provider::{BasecampProduct, OAuthConfig};
use super::refresh::TokenResponse;
use super::token::AccountToken;

/// How long a login waits for the browser redirect.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const STATE_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoginPhase {
    Idle,
    AwaitingRedirect,
    Exchanging,
    ResolvingAccounts,
    Done,
}

/// Progress notifications for whoever drives the login interactively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginEvent {
    Phase(LoginPhase),
    BrowserOpened { url: String },
    /// The browser could not be launched; the user has to open `url` by hand.
    BrowserUnavailable { url: String, reason: String },
}

pub type LoginObserver = Arc<dyn Fn(&LoginEvent) + Send + Sync>;

/// Opens the consent page for the user.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let mut child = open_command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // Reap the opener so it does not linger as a zombie.
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(%status, "browser opener exited unsuccessfully");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!("failed to wait for browser opener: {}", err),
        });
        Ok(())
    }
}

/// Hands `url` to the protocol handler directly; going through `cmd /C start`
/// would split the query string at `&`.
#[cfg(target_os = "windows")]
fn open_command(url: &str) -> Command {
    let mut command = Command::new("rundll32.exe");
    command.arg("url.dll,FileProtocolHandler").arg(url);
    command
}

#[cfg(target_os = "macos")]
fn open_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(default)]
    accounts: Vec<LaunchpadAccount>,
}

#[derive(Debug, Deserialize)]
struct LaunchpadAccount {
    id: i64,
    name: String,
    #[serde(default)]
    product: String,
}

/// Runs one interactive login at a time: opens the consent page, waits for the
/// loopback redirect, exchanges the code and resolves the Basecamp accounts
/// the grant covers.
pub struct AuthorizationFlow {
    client: reqwest::Client,
    config: OAuthConfig,
    browser: Arc<dyn BrowserLauncher>,
    observer: Option<LoginObserver>,
    in_progress: AtomicBool,
}

impl AuthorizationFlow {
    pub fn new(client: reqwest::Client, config: OAuthConfig) -> Self {
        Self {
            client,
            config,
            browser: Arc::new(SystemBrowser),
            observer: None,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_observer(mut self, observer: LoginObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run the flow to completion.
    ///
    /// Returns one token per eligible account, in provider order; all of them
    /// share the same token values. Nothing is persisted here, so
    /// [`LoginPhase::Done`] is left to the caller that stores the result.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Vec<AccountToken>, AuthError> {
        let _guard = InProgressGuard::acquire(&self.in_progress)?;
        self.emit(LoginEvent::Phase(LoginPhase::Idle));

        let state = generate_state();
        let (server, outcome_rx) =
            CallbackServer::start(self.config.callback_port, state.clone()).await?;
        let redirect_uri = self.config.redirect_uri(server.local_addr().port());

        let code = self
            .await_redirect(&state, &redirect_uri, outcome_rx, cancel)
            .await;
        server.shutdown().await;
        let code = code?;

        self.emit(LoginEvent::Phase(LoginPhase::Exchanging));
        let token = self.exchange_code(&code, &redirect_uri).await?;

        self.emit(LoginEvent::Phase(LoginPhase::ResolvingAccounts));
        let accounts = self.fetch_accounts(&token.access_token).await?;

        let obtained_at = Utc::now();
        let expires_in = token.expires_in_or_default();
        let refresh_token = token.refresh_token.unwrap_or_default();
        let token_type = token.token_type.unwrap_or_default();
        let tokens = accounts
            .into_iter()
            .map(|account| AccountToken {
                account_id: account.id.to_string(),
                account_name: account.name,
                access_token: token.access_token.clone(),
                refresh_token: refresh_token.clone(),
                token_type: token_type.clone(),
                expires_in,
                obtained_at,
            })
            .collect::<Vec<_>>();
        Ok(tokens)
    }

    async fn await_redirect(
        &self,
        state: &str,
        redirect_uri: &str,
        outcome_rx: oneshot::Receiver<CallbackOutcome>,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError> {
        let url = self.config.authorize_url_for(state, redirect_uri)?;
        self.emit(LoginEvent::Phase(LoginPhase::AwaitingRedirect));

        match self.browser.open(&url) {
            Ok(()) => self.emit(LoginEvent::BrowserOpened { url }),
            Err(err) => {
                tracing::warn!("failed to open browser: {}", err);
                self.emit(LoginEvent::BrowserUnavailable {
                    url,
                    reason: err.to_string(),
                });
            }
        }

        wait_for_outcome(outcome_rx, LOGIN_TIMEOUT, cancel).await
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/json")
            .form(&[
                ("type", "web_server"),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "authorization code exchange rejected");
            return Err(AuthError::ExchangeFailed(format!(
                "token endpoint returned {status}: {}",
                body.trim()
            )));
        }

        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("invalid token response: {e}")))?;
        if payload.access_token.is_empty() {
            return Err(AuthError::ExchangeFailed(
                "token response has no access_token".to_string(),
            ));
        }
        tracing::debug!("authorization code exchanged");
        Ok(payload)
    }

    async fn fetch_accounts(&self, access_token: &str) -> Result<Vec<LaunchpadAccount>, AuthError> {
        let resp = self
            .client
            .get(&self.config.identity_url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::network("account lookup", None, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "identity endpoint returned {status}"
            )));
        }

        let identity: IdentityResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("identity response: {e}")))?;
        let total = identity.accounts.len();
        let eligible = identity
            .accounts
            .into_iter()
            .filter(|account| BasecampProduct::is_eligible(&account.product))
            .collect::<Vec<_>>();
        tracing::debug!(total, eligible = eligible.len(), "resolved Launchpad accounts");

        if eligible.is_empty() {
            return Err(AuthError::NoEligibleAccounts);
        }
        Ok(eligible)
    }

    pub(crate) fn emit(&self, event: LoginEvent) {
        if let LoginEvent::Phase(phase) = &event {
            tracing::debug!(%phase, "login phase");
        }
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

struct InProgressGuard<'a>(&'a AtomicBool);

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AuthError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AuthError::AlreadyInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Unguessable anti-forgery value for the `state` parameter.
fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// First of: the redirect outcome, the timeout, or cancellation.
async fn wait_for_outcome(
    outcome_rx: oneshot::Receiver<CallbackOutcome>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, AuthError> {
    tokio::select! {
        outcome = outcome_rx => match outcome {
            Ok(CallbackOutcome::Success(code)) => Ok(code),
            Ok(CallbackOutcome::Failure(failure)) => Err(failure.into()),
            Err(_) => Err(AuthError::Listener(
                "callback listener stopped before a redirect arrived".to_string(),
            )),
        },
        _ = tokio::time::sleep(timeout) => Err(AuthError::TimedOut(timeout.as_secs())),
        _ = cancel.cancelled() => Err(AuthError::Cancelled),
    }
}

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use super::error::AuthError;
use super::flow::{AuthorizationFlow, BrowserLauncher, LoginEvent, LoginObserver, LoginPhase};
use super::provider::OAuthConfig;
use super::refresh::TokenRefresher;
use super::store::{CredentialStore, TokenStore};
use super::token::AccountToken;

/// Entry point for everything that needs Basecamp credentials.
///
/// Loads the credential store once, on first use, and writes it back after
/// every mutation. A mutation whose save fails leaves the in-memory view
/// unchanged.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use bc4::auth::{AuthClient, FileTokenStore, OAuthConfig};
///
/// # async fn run() -> Result<(), bc4::auth::AuthError> {
/// let config = OAuthConfig::builder()
///     .client_id("client")
///     .client_secret("secret")
///     .build();
/// let client = AuthClient::new(Arc::new(FileTokenStore::new("/tmp/bc4/auth.json")), config);
/// let token = client.get_token(None).await?;
/// println!("{}", token.account_name);
/// # Ok(())
/// # }
/// ```
pub struct AuthClient {
    store: Arc<dyn TokenStore>,
    credentials: Mutex<Option<CredentialStore>>,
    refresher: TokenRefresher,
    flow: AuthorizationFlow,
}

impl AuthClient {
    pub fn new(store: Arc<dyn TokenStore>, config: OAuthConfig) -> Self {
        Self::with_http_client(store, config, reqwest::Client::new())
    }

    pub fn with_http_client(
        store: Arc<dyn TokenStore>,
        config: OAuthConfig,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            credentials: Mutex::new(None),
            refresher: TokenRefresher::new(http.clone(), config.clone()),
            flow: AuthorizationFlow::new(http, config),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.flow = self.flow.with_browser(browser);
        self
    }

    pub fn with_observer(mut self, observer: LoginObserver) -> Self {
        self.flow = self.flow.with_observer(observer);
        self
    }

    /// All linked accounts keyed by account id.
    pub fn get_accounts(&self) -> Result<BTreeMap<String, AccountToken>, AuthError> {
        self.read(|store| store.accounts().clone())
    }

    pub fn get_default_account(&self) -> Result<Option<String>, AuthError> {
        self.read(|store| store.get_default().map(str::to_string))
    }

    pub fn set_default_account(&self, account_id: &str) -> Result<(), AuthError> {
        self.mutate(|store| store.set_default(account_id))?;
        tracing::info!(account_id, "default account changed");
        Ok(())
    }

    /// A non-expired token for `account_id`, or for the default account when
    /// `None` or empty. Expired tokens are refreshed and persisted first.
    pub async fn get_token(&self, account_id: Option<&str>) -> Result<AccountToken, AuthError> {
        let token = self.resolve(account_id)?;
        if !token.is_expired() {
            return Ok(token);
        }
        tracing::debug!(account_id = %token.account_id, "access token expired");
        self.refresh_and_store(&token).await
    }

    /// Refresh regardless of expiry.
    pub async fn force_refresh(&self, account_id: Option<&str>) -> Result<AccountToken, AuthError> {
        let token = self.resolve(account_id)?;
        self.refresh_and_store(&token).await
    }

    /// Remove one account, or every account when `None` or empty.
    pub fn logout(&self, account_id: Option<&str>) -> Result<(), AuthError> {
        match account_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                self.mutate(|store| {
                    store
                        .remove(id)
                        .map(|_| ())
                        .ok_or_else(|| AuthError::AccountNotFound(id.to_string()))
                })?;
                tracing::info!(account_id = id, "logged out");
            }
            None => {
                self.mutate(|store| {
                    store.remove_all();
                    Ok(())
                })?;
                tracing::info!("logged out of all accounts");
            }
        }
        Ok(())
    }

    /// Run the interactive login and link every eligible account it yields.
    ///
    /// Returns the primary account. The default account is only set when none
    /// was set before; other accounts already linked are kept. Observers see
    /// [`LoginPhase::Done`] only once the accounts are saved.
    pub async fn login(&self, cancel: &CancellationToken) -> Result<AccountToken, AuthError> {
        let tokens = self.flow.run(cancel).await?;
        let primary = tokens
            .first()
            .cloned()
            .ok_or(AuthError::NoEligibleAccounts)?;

        self.mutate(|store| {
            for token in &tokens {
                store.put(token.account_id.clone(), token.clone());
            }
            if store.get_default().is_none() {
                store.set_default(&primary.account_id)?;
            }
            Ok(())
        })?;
        self.flow.emit(LoginEvent::Phase(LoginPhase::Done));
        tracing::info!(
            accounts = tokens.len(),
            primary = %primary.account_id,
            "login complete"
        );
        Ok(primary)
    }

    async fn refresh_and_store(&self, token: &AccountToken) -> Result<AccountToken, AuthError> {
        let refreshed = self.refresher.refresh(token).await?;
        self.mutate(|store| {
            store.put(refreshed.account_id.clone(), refreshed.clone());
            Ok(())
        })?;
        tracing::info!(account_id = %refreshed.account_id, "access token refreshed");
        Ok(refreshed)
    }

    fn resolve(&self, account_id: Option<&str>) -> Result<AccountToken, AuthError> {
        self.read(|store| {
            if store.is_empty() {
                return Err(AuthError::NoAuthenticatedAccounts);
            }
            let id = match account_id.filter(|id| !id.is_empty()) {
                Some(id) => id,
                None => store.get_default().ok_or(AuthError::NoDefaultAccount)?,
            };
            store
                .get(id)
                .cloned()
                .ok_or_else(|| AuthError::AccountNotFound(id.to_string()))
        })?
    }

    fn read<R>(&self, f: impl FnOnce(&CredentialStore) -> R) -> Result<R, AuthError> {
        let mut guard = self.lock();
        let store = self.loaded(&mut guard)?;
        Ok(f(store))
    }

    /// Apply `f` to a copy, persist it, then publish it.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut CredentialStore) -> Result<R, AuthError>,
    ) -> Result<R, AuthError> {
        let mut guard = self.lock();
        let mut next = self.loaded(&mut guard)?.clone();
        let result = f(&mut next)?;
        self.store.save(&next)?;
        *guard = Some(next);
        Ok(result)
    }

    fn loaded<'a>(
        &self,
        guard: &'a mut MutexGuard<'_, Option<CredentialStore>>,
    ) -> Result<&'a mut CredentialStore, AuthError> {
        if guard.is_none() {
            **guard = Some(self.store.load()?);
        }
        guard
            .as_mut()
            .ok_or_else(|| AuthError::storage("load", "credential cache unavailable"))
    }

    fn lock(&self) -> MutexGuard<'_, Option<CredentialStore>> {
        match self.credentials.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

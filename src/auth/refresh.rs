//! Refresh-token grant against the provider's token endpoint.

use chrono::Utc;
use serde::Deserialize;

use super::error::AuthError;
use super::provider::OAuthConfig;
use super::token::{AccountToken, MAX_EXPIRES_IN_SECS};

/// Launchpad omits `expires_in` on some responses; its access tokens live two weeks.
pub(crate) const DEFAULT_EXPIRES_IN_SECS: i64 = 14 * 24 * 60 * 60;

/// Token endpoint response shared by the code exchange and refresh grants.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
    #[serde(default)]
    pub(crate) token_type: Option<String>,
    #[serde(default)]
    pub(crate) expires_in: Option<i64>,
}

impl TokenResponse {
    pub(crate) fn expires_in_or_default(&self) -> i64 {
        self.expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| secs.min(MAX_EXPIRES_IN_SECS))
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }
}

/// Exchanges refresh tokens for new access tokens.
///
/// Never retries: a rejected refresh is reported so the caller can ask the
/// user to log in again.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    client: reqwest::Client,
    config: OAuthConfig,
}

impl TokenRefresher {
    pub fn new(client: reqwest::Client, config: OAuthConfig) -> Self {
        Self { client, config }
    }

    /// Refresh `token`, keeping its account identity.
    pub async fn refresh(&self, token: &AccountToken) -> Result<AccountToken, AuthError> {
        if !token.has_refresh_token() {
            return Err(AuthError::NoRefreshToken(token.account_id.clone()));
        }

        tracing::debug!(account_id = %token.account_id, "refreshing access token");
        let resp = self
            .client
            .post(&self.config.token_url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/json")
            .form(&[
                ("type", "refresh"),
                ("grant_type", "refresh_token"),
                ("refresh_token", token.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::network("token refresh", Some(&token.account_id), e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(
                account_id = %token.account_id,
                status = status.as_u16(),
                "token refresh rejected"
            );
            return Err(AuthError::RefreshRejected {
                account_id: token.account_id.clone(),
                status: status.as_u16(),
            });
        }

        let refresh_failed = |message: String| AuthError::RefreshFailed {
            account_id: token.account_id.clone(),
            message,
        };
        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|e| refresh_failed(format!("invalid token response: {e}")))?;
        if payload.access_token.is_empty() {
            return Err(refresh_failed("token response has no access_token".to_string()));
        }
        let expires_in = payload.expires_in_or_default();

        Ok(AccountToken {
            account_id: token.account_id.clone(),
            account_name: token.account_name.clone(),
            access_token: payload.access_token,
            refresh_token: payload
                .refresh_token
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| token.refresh_token.clone()),
            token_type: payload
                .token_type
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| token.token_type.clone()),
            expires_in,
            obtained_at: Utc::now(),
        })
    }
}

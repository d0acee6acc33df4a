use thiserror::Error;

/// Authentication and credential-lifecycle errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No authenticated accounts")]
    NoAuthenticatedAccounts,
    #[error("No default account selected")]
    NoDefaultAccount,
    #[error("Account {0} not found")]
    AccountNotFound(String),
    #[error("Authentication expired for account {0}: no refresh token available, please log in again")]
    NoRefreshToken(String),
    #[error("Authentication expired for account {account_id}: token refresh rejected with status {status}, please log in again")]
    RefreshRejected { account_id: String, status: u16 },
    #[error("Authentication expired for account {account_id}: token refresh failed ({message}), please log in again")]
    RefreshFailed { account_id: String, message: String },
    #[error("Invalid state parameter in authorization callback")]
    StateMismatch,
    #[error("No authorization code received")]
    MissingCode,
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("Failed to exchange authorization code: {0}")]
    ExchangeFailed(String),
    #[error("No Basecamp accounts found for this login")]
    NoEligibleAccounts,
    #[error("Authentication timed out after {0} seconds")]
    TimedOut(u64),
    #[error("Authentication cancelled")]
    Cancelled,
    #[error("A login flow is already in progress")]
    AlreadyInProgress,
    #[error("Callback listener error: {0}")]
    Listener(String),
    #[error("Credential storage error ({operation}): {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
    #[error("Credential file {path} is corrupted: {message}")]
    StorageCorrupted { path: String, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error during {operation}{}: {message}", for_account(.account_id))]
    Network {
        operation: &'static str,
        account_id: Option<String>,
        message: String,
    },
}

fn for_account(account_id: &Option<String>) -> String {
    account_id
        .as_deref()
        .map(|id| format!(" for account {id}"))
        .unwrap_or_default()
}

impl AuthError {
    pub(crate) fn storage(operation: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation,
            message: error.to_string(),
        }
    }

    pub(crate) fn network(
        operation: &'static str,
        account_id: Option<&str>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::Network {
            operation,
            account_id: account_id.map(str::to_string),
            message: error.to_string(),
        }
    }

    /// Whether recovering from this error requires an interactive `auth login`.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NoAuthenticatedAccounts
                | Self::NoRefreshToken(_)
                | Self::RefreshRejected { .. }
                | Self::RefreshFailed { .. }
        )
    }
}

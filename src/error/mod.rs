//! Error types for bc4.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for all bc4 operations.
#[derive(Error, Debug)]
pub enum Bc4Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Bc4Error {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::InvalidArgument(_) => ErrorCategory::InvalidInput,
            Self::Auth(err) => match err {
                AuthError::NoAuthenticatedAccounts
                | AuthError::NoRefreshToken(_)
                | AuthError::RefreshRejected { .. }
                | AuthError::RefreshFailed { .. }
                | AuthError::ExchangeFailed(_) => ErrorCategory::Authentication,
                AuthError::StateMismatch
                | AuthError::MissingCode
                | AuthError::AuthorizationDenied(_)
                | AuthError::NoEligibleAccounts
                | AuthError::AlreadyInProgress => ErrorCategory::Authorization,
                AuthError::NoDefaultAccount | AuthError::AccountNotFound(_) => {
                    ErrorCategory::InvalidInput
                }
                AuthError::TimedOut(_) => ErrorCategory::Timeout,
                AuthError::Cancelled => ErrorCategory::Cancelled,
                AuthError::Storage { .. } | AuthError::StorageCorrupted { .. } => {
                    ErrorCategory::Storage
                }
                AuthError::Listener(_) => ErrorCategory::Configuration,
                AuthError::Network { .. } | AuthError::InvalidResponse(_) => ErrorCategory::Network,
            },
        }
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            Self::Auth(AuthError::StorageCorrupted { .. }) => {
                return RecoverySuggestion::RepairCredentialFile
            }
            Self::Auth(AuthError::NoDefaultAccount | AuthError::AccountNotFound(_)) => {
                return RecoverySuggestion::SelectAccount
            }
            Self::Auth(AuthError::AlreadyInProgress) => return RecoverySuggestion::None,
            _ => {}
        }
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::Login,
            ErrorCategory::Authorization | ErrorCategory::Timeout => RecoverySuggestion::RetryLogin,
            ErrorCategory::Network => RecoverySuggestion::CheckNetwork,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::InvalidInput => RecoverySuggestion::CheckInput,
            ErrorCategory::Storage | ErrorCategory::Serialization | ErrorCategory::Cancelled => {
                RecoverySuggestion::None
            }
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Bc4Error>;

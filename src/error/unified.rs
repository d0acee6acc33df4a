//! Error classification and recovery hints.

use strum::Display;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Network,
    Timeout,
    Cancelled,
    Configuration,
    Storage,
    Serialization,
    InvalidInput,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Run `bc4 auth login`.
    Login,
    /// Pick a linked account, e.g. with `bc4 account set`.
    SelectAccount,
    /// Fix or re-run setup for `config.json` / environment variables.
    CheckConfiguration,
    CheckNetwork,
    RetryLogin,
    /// Move the broken credential file aside and log in again.
    RepairCredentialFile,
    CheckInput,
    None,
}

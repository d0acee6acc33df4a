//! CLI-specific error formatting for user-facing messages.

use crate::error::{Bc4Error, RecoverySuggestion};

/// Map a [`Bc4Error`] to a user-facing help string with actionable guidance.
pub fn format_error_help(err: &Bc4Error) -> String {
    match err.recovery_suggestion() {
        RecoverySuggestion::Login => format!("{err}. Run: bc4 auth login"),
        RecoverySuggestion::RetryLogin => format!("{err}. Run bc4 auth login to try again"),
        RecoverySuggestion::SelectAccount => {
            format!("{err}. Run: bc4 account list, then bc4 account set <ACCOUNT_ID>")
        }
        RecoverySuggestion::CheckConfiguration => format!(
            "{err}. Check config.json in {} or the BC4_* environment variables",
            crate::config::config_dir().display()
        ),
        RecoverySuggestion::CheckNetwork => {
            format!("{err}. Check your network connection and try again")
        }
        RecoverySuggestion::RepairCredentialFile => {
            format!("{err}. Move the file aside and run: bc4 auth login")
        }
        RecoverySuggestion::CheckInput | RecoverySuggestion::None => format!("{err}"),
    }
}

//! Tests for the error system.

use bc4::auth::AuthError;
use bc4::error::*;

#[test]
fn auth_errors_display_through_crate_error() {
    let err = Bc4Error::from(AuthError::AccountNotFound("999".to_string()));
    assert_eq!(err.to_string(), "Account 999 not found");
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: Bc4Error,
        expected_category: ErrorCategory,
        expected_recovery: RecoverySuggestion,
    }

    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: AuthError::NoAuthenticatedAccounts.into(),
            expected_category: ErrorCategory::Authentication,
            expected_recovery: RecoverySuggestion::Login,
        },
        Case {
            error: AuthError::RefreshRejected {
                account_id: "111".to_string(),
                status: 401,
            }
            .into(),
            expected_category: ErrorCategory::Authentication,
            expected_recovery: RecoverySuggestion::Login,
        },
        Case {
            error: AuthError::RefreshFailed {
                account_id: "111".to_string(),
                message: "invalid token response".to_string(),
            }
            .into(),
            expected_category: ErrorCategory::Authentication,
            expected_recovery: RecoverySuggestion::Login,
        },
        Case {
            error: AuthError::NoDefaultAccount.into(),
            expected_category: ErrorCategory::InvalidInput,
            expected_recovery: RecoverySuggestion::SelectAccount,
        },
        Case {
            error: AuthError::StateMismatch.into(),
            expected_category: ErrorCategory::Authorization,
            expected_recovery: RecoverySuggestion::RetryLogin,
        },
        Case {
            error: AuthError::TimedOut(300).into(),
            expected_category: ErrorCategory::Timeout,
            expected_recovery: RecoverySuggestion::RetryLogin,
        },
        Case {
            error: AuthError::Cancelled.into(),
            expected_category: ErrorCategory::Cancelled,
            expected_recovery: RecoverySuggestion::None,
        },
        Case {
            error: AuthError::Network {
                operation: "token refresh",
                account_id: Some("111".to_string()),
                message: "connection refused".to_string(),
            }
            .into(),
            expected_category: ErrorCategory::Network,
            expected_recovery: RecoverySuggestion::CheckNetwork,
        },
        Case {
            error: AuthError::StorageCorrupted {
                path: "auth.json".to_string(),
                message: "EOF".to_string(),
            }
            .into(),
            expected_category: ErrorCategory::Storage,
            expected_recovery: RecoverySuggestion::RepairCredentialFile,
        },
        Case {
            error: Bc4Error::Configuration("missing client_id".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: Bc4Error::Io(io_error),
            expected_category: ErrorCategory::Storage,
            expected_recovery: RecoverySuggestion::None,
        },
        Case {
            error: Bc4Error::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_recovery: RecoverySuggestion::None,
        },
        Case {
            error: Bc4Error::InvalidArgument("account id".to_string()),
            expected_category: ErrorCategory::InvalidInput,
            expected_recovery: RecoverySuggestion::CheckInput,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category, "{}", case.error);
        assert_eq!(
            case.error.recovery_suggestion(),
            case.expected_recovery,
            "{}",
            case.error
        );
    }
}

#[test]
fn category_names_are_snake_case() {
    assert_eq!(ErrorCategory::InvalidInput.to_string(), "invalid_input");
}

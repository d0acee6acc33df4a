//! Per-account OAuth token payload.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh tokens this many seconds before they actually expire.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 5 * 60;

/// Upper bound accepted for a token lifetime: one year.
pub const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 60 * 60;

/// Credentials for one linked Basecamp account.
///
/// The expiry instant is never stored; it is always `obtained_at + expires_in`.
///
/// # Example
/// ```
/// use bc4::auth::AccountToken;
/// use chrono::Utc;
///
/// let token = AccountToken {
///     account_id: "111".to_string(),
///     account_name: "Acme".to_string(),
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     token_type: "Bearer".to_string(),
///     expires_in: 1_209_600,
///     obtained_at: Utc::now(),
/// };
/// assert!(!token.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountToken {
    pub account_id: String,
    pub account_name: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: i64,
    pub obtained_at: DateTime<Utc>,
}

impl AccountToken {
    /// Instant at which the provider stops accepting this access token.
    ///
    /// Lifetimes are capped at [`MAX_EXPIRES_IN_SECS`], so a hand-edited or
    /// hostile `expires_in` cannot overflow the calendar.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = Duration::try_seconds(self.expires_in.min(MAX_EXPIRES_IN_SECS))
            .unwrap_or_else(Duration::zero);
        self.obtained_at
            .checked_add_signed(lifetime)
            .unwrap_or(self.obtained_at)
    }

    /// Expiry check using the default safety margin.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now(), Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS))
    }

    /// True when `now >= obtained_at + expires_in - margin`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at().checked_sub_signed(margin) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margin() -> Duration {
        Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS)
    }

    fn token_obtained(ago: Duration, expires_in: i64) -> (AccountToken, DateTime<Utc>) {
        let now = Utc::now();
        let token = AccountToken {
            account_id: "111".to_string(),
            account_name: "Acme".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
            obtained_at: now - ago,
        };
        (token, now)
    }

    #[test]
    fn token_just_inside_margin_is_fresh() {
        let expires_in = 3600;
        let ago = Duration::seconds(expires_in) - margin() - Duration::seconds(1);
        let (token, now) = token_obtained(ago, expires_in);
        assert!(!token.is_expired_at(now, margin()));
    }

    #[test]
    fn token_just_past_margin_is_expired() {
        let expires_in = 3600;
        let ago = Duration::seconds(expires_in) - margin() + Duration::seconds(1);
        let (token, now) = token_obtained(ago, expires_in);
        assert!(token.is_expired_at(now, margin()));
    }

    #[test]
    fn expiry_is_derived_from_obtained_at() {
        let (token, _) = token_obtained(Duration::zero(), 120);
        assert_eq!(token.expires_at() - token.obtained_at, Duration::seconds(120));
    }

    #[test]
    fn oversized_lifetime_is_capped_instead_of_overflowing() {
        let (mut token, now) = token_obtained(Duration::zero(), 100_000_000_000_000);
        assert_eq!(
            token.expires_at() - token.obtained_at,
            Duration::seconds(MAX_EXPIRES_IN_SECS)
        );
        assert!(!token.is_expired_at(now, margin()));

        token.expires_in = i64::MAX;
        assert!(!token.is_expired());
    }

    #[test]
    fn negative_lifetime_is_already_expired() {
        let (token, now) = token_obtained(Duration::zero(), i64::MIN);
        assert!(token.is_expired_at(now, margin()));
    }

    #[test]
    fn blank_refresh_token_is_absent() {
        let (mut token, _) = token_obtained(Duration::zero(), 120);
        token.refresh_token = "  ".to_string();
        assert!(!token.has_refresh_token());
    }
}

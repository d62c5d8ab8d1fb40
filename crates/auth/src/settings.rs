use chrono::Duration;
use serde::{Deserialize, Serialize};

use warden_core::{AuthError, AuthResult};

use crate::password::{self, DEFAULT_PASSWORD_REGEX};
use crate::usernames::DEFAULT_USERNAME_REGEX;

/// Upper bound for any session lifetime (seconds), about a century.
pub const MAX_SESSION_LIFETIME: i64 = 60 * 60 * 24 * 365 * 100;
/// Upper bound for the failed-challenge reset window (minutes).
pub const MAX_RESET_WINDOW_MINUTES: i64 = 60 * 24 * 365 * 100;

/// Per-tenant credentials policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSettings {
    pub guest_sign_up_enabled: bool,
    pub username_regex: String,
    pub password_regex: String,
    /// Session lifetime when the caller does not ask for one (seconds).
    pub session_default_lifetime: i64,
    /// Upper bound for a caller-requested lifetime (seconds).
    pub session_maximum_lifetime: i64,
    /// Sessions kept per credentials; older ones are purged on save.
    pub sessions_size_max: usize,
    /// Failed challenges before the account is disabled. 0 disables lockout.
    pub max_invalid_challenges: u32,
    /// Minutes after which the failed-challenge counter starts over.
    pub reset_invalid_challenges_after_minutes: i64,
}

impl Default for CredentialsSettings {
    fn default() -> Self {
        Self {
            guest_sign_up_enabled: false,
            username_regex: DEFAULT_USERNAME_REGEX.to_string(),
            password_regex: DEFAULT_PASSWORD_REGEX.to_string(),
            session_default_lifetime: 60 * 60 * 24,
            session_maximum_lifetime: 60 * 60 * 24 * 30,
            sessions_size_max: 10,
            max_invalid_challenges: 0,
            reset_invalid_challenges_after_minutes: 60,
        }
    }
}

impl CredentialsSettings {
    /// Reject settings no login or save could work with.
    pub fn validate(&self) -> AuthResult<()> {
        if self.sessions_size_max == 0 {
            return Err(AuthError::illegal_argument(
                "sessions size max should be greater than 0",
            ));
        }
        if !(1..=MAX_SESSION_LIFETIME).contains(&self.session_maximum_lifetime) {
            return Err(AuthError::illegal_argument(format!(
                "session maximum lifetime [{}] must be within [1, {MAX_SESSION_LIFETIME}] seconds",
                self.session_maximum_lifetime
            )));
        }
        if !(1..=self.session_maximum_lifetime).contains(&self.session_default_lifetime) {
            return Err(AuthError::illegal_argument(format!(
                "session default lifetime [{}] must be within [1, {}] seconds",
                self.session_default_lifetime, self.session_maximum_lifetime
            )));
        }
        if !(0..=MAX_RESET_WINDOW_MINUTES).contains(&self.reset_invalid_challenges_after_minutes) {
            return Err(AuthError::illegal_argument(format!(
                "invalid challenges reset window [{}] must be within [0, {MAX_RESET_WINDOW_MINUTES}] minutes",
                self.reset_invalid_challenges_after_minutes
            )));
        }
        password::full_match_regex(&self.username_regex)?;
        password::full_match_regex(&self.password_regex)?;
        Ok(())
    }

    pub fn default_lifetime(&self) -> AuthResult<Duration> {
        Duration::try_seconds(self.session_default_lifetime).ok_or_else(|| {
            AuthError::illegal_argument(format!(
                "session default lifetime [{}] is out of range",
                self.session_default_lifetime
            ))
        })
    }

    pub fn reset_window(&self) -> AuthResult<Duration> {
        Duration::try_minutes(self.reset_invalid_challenges_after_minutes).ok_or_else(|| {
            AuthError::illegal_argument(format!(
                "invalid challenges reset window [{}] is out of range",
                self.reset_invalid_challenges_after_minutes
            ))
        })
    }

    /// Lifetime to grant for a login.
    ///
    /// `requested` is in seconds; asking for more than the maximum is
    /// forbidden rather than silently capped.
    pub fn check_session_lifetime(&self, requested: Option<i64>) -> AuthResult<Duration> {
        let Some(requested) = requested else {
            return self.default_lifetime();
        };
        if requested <= 0 {
            return Err(AuthError::illegal_argument(format!(
                "session lifetime [{requested}] must be positive"
            )));
        }
        if requested > self.session_maximum_lifetime {
            return Err(AuthError::forbidden(format!(
                "maximum session lifetime is [{}] seconds",
                self.session_maximum_lifetime
            )));
        }
        Duration::try_seconds(requested).ok_or_else(|| {
            AuthError::illegal_argument(format!("session lifetime [{requested}] is out of range"))
        })
    }
}

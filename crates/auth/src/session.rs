use std::cmp::Ordering;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use warden_core::{AuthError, AuthResult};

const TOKEN_BYTES: usize = 32;

/// One issued bearer token and its validity window.
///
/// Identity is the token: two sessions are equal iff their tokens are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    /// `None` only for sessions imported without a timestamp; they sort as
    /// the oldest.
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// New session with a fresh random token, valid for `lifetime`.
    ///
    /// Fails with `IllegalArgument` when the expiry is not representable.
    pub fn issue(now: DateTime<Utc>, lifetime: Duration) -> AuthResult<Self> {
        let expires_at = now.checked_add_signed(lifetime).ok_or_else(|| {
            AuthError::illegal_argument(format!(
                "session lifetime [{}s] is out of range",
                lifetime.num_seconds()
            ))
        })?;
        Ok(Self {
            access_token: generate_token(),
            created_at: Some(now),
            expires_at,
        })
    }

    /// Session carrying a known token. The expiry saturates at the latest
    /// representable instant.
    pub fn with_token(access_token: impl Into<String>, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            created_at: Some(now),
            expires_at: now
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Remaining lifetime in whole seconds, rounded up, never negative.
    pub fn expires_in(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.expires_at - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis as u64).div_ceil(1000)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_in(now) == 0
    }

    /// Most recent first; sessions without a creation instant go last.
    pub fn recency(a: &Session, b: &Session) -> Ordering {
        match (a.created_at, b.created_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.access_token == other.access_token
    }
}

impl Eq for Session {}

/// 32 bytes from the OS RNG, URL-safe base64 without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

//! `Authorization` header parsing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use warden_core::{AuthError, AuthResult};

/// Credentials carried by an `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthorizationHeader {
    /// `Basic base64(username:password)`
    Basic { username: String, password: String },
    /// `Bearer <access token>`
    Bearer(String),
}

impl AuthorizationHeader {
    /// Schemes are matched case-insensitively. Anything but `Basic` and
    /// `Bearer` is rejected.
    pub fn parse(value: &str) -> AuthResult<Self> {
        let value = value.trim();
        let (scheme, payload) = value
            .split_once(' ')
            .ok_or_else(|| AuthError::illegal_argument("authorization header has no scheme"))?;
        let payload = payload.trim();

        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(payload)
                .map_err(|_| AuthError::illegal_argument("basic authorization is not base64"))?;
            let decoded = String::from_utf8(decoded)
                .map_err(|_| AuthError::illegal_argument("basic authorization is not utf-8"))?;
            let (username, password) = decoded.split_once(':').ok_or_else(|| {
                AuthError::illegal_argument("basic authorization has no [username:password] pair")
            })?;
            if username.is_empty() {
                return Err(AuthError::illegal_argument("basic authorization username is empty"));
            }
            Ok(Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        } else if scheme.eq_ignore_ascii_case("bearer") {
            if payload.is_empty() {
                return Err(AuthError::illegal_argument("bearer authorization token is empty"));
            }
            Ok(Self::Bearer(payload.to_string()))
        } else {
            Err(AuthError::illegal_argument(format!(
                "authorization scheme [{scheme}] is not supported"
            )))
        }
    }
}

// Never print passwords or tokens.
impl core::fmt::Debug for AuthorizationHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

//! Password hashing and password policy.
//!
//! Digests are deterministic for a given installation (one configured salt),
//! and carry their own algorithm tag and iteration count:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<base64 of 32 bytes>
//! ```
//!
//! Raising the configured iteration count therefore never invalidates the
//! digests already stored.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use warden_core::{AuthError, AuthResult};

const ALGORITHM: &str = "pbkdf2-sha256";
const OUTPUT_LEN: usize = 32;

pub const DEFAULT_ITERATIONS: u32 = 10_000;
pub const DEFAULT_PASSWORD_REGEX: &str = ".{6,}";

/// Installation-wide password hasher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHasher {
    salt: String,
    #[serde(default = "default_iterations")]
    iterations: u32,
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

impl PasswordHasher {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn hash(&self, plaintext: &str) -> String {
        let derived = self.derive(plaintext, self.iterations);
        format!("{ALGORITHM}${}${}", self.iterations, STANDARD.encode(derived))
    }

    /// Whether `plaintext` hashes to `digest`.
    ///
    /// Digests in any other format fail with `PasswordResetRequired`: the
    /// only way out for such an account is a password reset.
    pub fn matches(&self, plaintext: &str, digest: &str) -> AuthResult<bool> {
        let (iterations, expected) = parse_digest(digest)?;
        let derived = self.derive(plaintext, iterations);
        Ok(constant_time_eq(&derived, &expected))
    }

    fn derive(&self, plaintext: &str, iterations: u32) -> [u8; OUTPUT_LEN] {
        let mut out = [0u8; OUTPUT_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            plaintext.as_bytes(),
            self.salt.as_bytes(),
            iterations,
            &mut out,
        );
        out
    }
}

fn parse_digest(digest: &str) -> AuthResult<(u32, Vec<u8>)> {
    let unsupported =
        || AuthError::PasswordResetRequired("stored password digest format is not supported".to_string());

    let mut parts = digest.splitn(3, '$');
    let (Some(algorithm), Some(iterations), Some(encoded)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(unsupported());
    };
    if algorithm != ALGORITHM {
        return Err(unsupported());
    }
    let iterations: u32 = iterations.parse().map_err(|_| unsupported())?;
    if iterations == 0 {
        return Err(unsupported());
    }
    let bytes = STANDARD.decode(encoded).map_err(|_| unsupported())?;
    if bytes.len() != OUTPUT_LEN {
        return Err(unsupported());
    }
    Ok((iterations, bytes))
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check `plaintext` against a tenant's password policy.
///
/// The policy must match the whole password. `None` uses
/// [`DEFAULT_PASSWORD_REGEX`].
pub fn check(plaintext: &str, policy: Option<&str>) -> AuthResult<()> {
    let pattern = policy.unwrap_or(DEFAULT_PASSWORD_REGEX);
    let regex = full_match_regex(pattern)?;
    if regex.is_match(plaintext) {
        Ok(())
    } else {
        Err(AuthError::NonCompliantPassword(format!(
            "password does not match [{pattern}]"
        )))
    }
}

/// Compile `pattern` anchored at both ends.
pub(crate) fn full_match_regex(pattern: &str) -> AuthResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| AuthError::illegal_argument(format!("invalid regex [{pattern}]: {e}")))
}

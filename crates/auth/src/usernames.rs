use once_cell::sync::Lazy;
use regex::Regex;

use warden_core::{AuthError, AuthResult};

use crate::password::full_match_regex;

pub const DEFAULT_USERNAME_REGEX: &str = r"[a-zA-Z0-9_%@+\-\.]{3,}";

/// Built-in identities; no new username may start with one of these.
pub const RESERVED_PREFIXES: [&str; 2] = ["superdog", "guest"];

static DEFAULT_USERNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^(?:{DEFAULT_USERNAME_REGEX})$")).expect("default username regex is valid")
});

/// Validate a username against `policy` (or the default policy).
pub fn check(username: &str, policy: Option<&str>) -> AuthResult<()> {
    let matched = match policy {
        None => DEFAULT_USERNAME.is_match(username),
        Some(pattern) => full_match_regex(pattern)?.is_match(username),
    };
    if !matched {
        return Err(AuthError::illegal_argument(format!(
            "username [{username}] is invalid"
        )));
    }
    Ok(())
}

/// Reject usernames squatting on a built-in identity.
pub fn check_not_reserved(username: &str) -> AuthResult<()> {
    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| username.starts_with(*p)) {
        return Err(AuthError::illegal_argument(format!(
            "username [{username}] is reserved: usernames may not start with [{prefix}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        assert!(check("vince", None).is_ok());
        assert!(check("fred.dupont+test@acme.io", None).is_ok());
        assert!(check("ab", None).is_err());
        assert!(check("has space", None).is_err());
        assert!(check("slash/", None).is_err());
    }

    #[test]
    fn tenant_policy_overrides_default() {
        assert!(check("ab", Some("[a-z]{2}")).is_ok());
        assert!(check("vince", Some("[a-z]{2}")).is_err());
    }

    #[test]
    fn reserved_prefixes() {
        assert!(check_not_reserved("superdog").is_err());
        assert!(check_not_reserved("superdog-fake").is_err());
        assert!(check_not_reserved("guest42").is_err());
        assert!(check_not_reserved("dog").is_ok());
        assert!(check_not_reserved("myguest").is_ok());
    }
}

//! Strongly-typed identifiers used across the core.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Name of the platform itself. Tenants may never embed it in their id.
pub const RESERVED_PLATFORM_ID: &str = "spacedog";

const TENANT_ID_MIN_LEN: usize = 4;

/// Identifier of a tenant (a "backend").
///
/// Always lowercase `[a-z0-9]{4,}` and never contains
/// [`RESERVED_PLATFORM_ID`]. Construct through [`TenantId::parse`] or
/// `FromStr`; deserialization validates too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(id: impl Into<String>) -> Result<Self, AuthError> {
        let id = id.into();
        Self::check_valid(&id)?;
        Ok(Self(id))
    }

    pub fn is_valid(id: &str) -> bool {
        id.len() >= TENANT_ID_MIN_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            && !id.contains(RESERVED_PLATFORM_ID)
    }

    pub fn check_valid(id: &str) -> Result<(), AuthError> {
        if id.is_empty() {
            return Err(AuthError::illegal_argument("tenant id is empty"));
        }
        if !Self::is_valid(id) {
            return Err(AuthError::illegal_argument(format!(
                "tenant id [{id}] must be at least {TENANT_ID_MIN_LEN} characters long, \
                 only contain a-z and 0-9 characters and not contain '{RESERVED_PLATFORM_ID}'"
            )));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// Opaque identifier of a credentials aggregate.
///
/// Freshly created credentials get a time-ordered UUIDv7; well-known built-in
/// identities (guest, superdog) use their role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialsId(String);

impl CredentialsId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CredentialsId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for CredentialsId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for CredentialsId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for CredentialsId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for CredentialsId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_rules() {
        assert!(TenantId::parse("acme1").is_ok());
        assert!(TenantId::parse("test").is_ok());

        // too short
        assert!(matches!(
            TenantId::parse("ab1"),
            Err(AuthError::IllegalArgument(_))
        ));
        // uppercase and reserved substring
        assert!(TenantId::parse("hasSpacedogInIt").is_err());
        assert!(TenantId::parse("myspacedog1").is_err());
        // outside [a-z0-9]
        assert!(TenantId::parse("my-app").is_err());
        assert!(TenantId::parse("my.app").is_err());
        assert!(TenantId::parse("").is_err());
    }

    #[test]
    fn tenant_id_conversion_validates() {
        let ok = TenantId::try_from("acme1".to_string()).unwrap();
        assert_eq!(String::from(ok), "acme1");
        assert!(TenantId::try_from("ab".to_string()).is_err());
    }

    #[test]
    fn credentials_ids_are_unique() {
        assert_ne!(CredentialsId::new(), CredentialsId::new());
        assert!(CredentialsId::from("guest") == *"guest");
    }
}

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::{AuthError, AuthResult};

/// Role identifier used for RBAC.
///
/// Five roles are ranked and form the administration hierarchy
/// (`guest` < `user` < `admin` < `superadmin` < `superdog`). Any other valid
/// name is a tenant-defined business role (e.g. `driver`) with no rank of
/// its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const GUEST: Role = Role(Cow::Borrowed("guest"));
    pub const USER: Role = Role(Cow::Borrowed("user"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const SUPERADMIN: Role = Role(Cow::Borrowed("superadmin"));
    /// Platform super-operator, outside any tenant.
    pub const SUPERDOG: Role = Role(Cow::Borrowed("superdog"));
    /// Wildcard role granted to every caller, guests included.
    pub const ALL: Role = Role(Cow::Borrowed("all"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse and validate a role name (`[a-z]{3,}`).
    pub fn parse(name: impl Into<Cow<'static, str>>) -> AuthResult<Self> {
        let role = Self(name.into());
        Self::check_valid(role.as_str())?;
        Ok(role)
    }

    pub fn is_valid(name: &str) -> bool {
        name.len() >= 3 && name.bytes().all(|b| b.is_ascii_lowercase())
    }

    pub fn check_valid(name: &str) -> AuthResult<()> {
        if Self::is_valid(name) {
            Ok(())
        } else {
            Err(AuthError::illegal_argument(format!(
                "role [{name}] is invalid: must be at least 3 lowercase letters [a-z]"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position in the administration hierarchy. Unranked roles are 0.
    pub fn rank(&self) -> u8 {
        match self.as_str() {
            "superdog" => 4,
            "superadmin" => 3,
            "admin" => 2,
            "user" => 1,
            _ => 0,
        }
    }

    /// Minimum caller rank needed to grant, revoke or administer this role.
    ///
    /// Ranked roles require their own rank; everything else (guest,
    /// business roles) requires an administrator.
    pub fn required_rank_to_manage(&self) -> u8 {
        match self.as_str() {
            "superdog" => 4,
            "superadmin" => 3,
            "admin" => 2,
            "user" => 1,
            _ => 2,
        }
    }

    /// The ranked role a given rank stands for.
    pub fn for_rank(rank: u8) -> Role {
        match rank {
            0 => Role::GUEST,
            1 => Role::USER,
            2 => Role::ADMIN,
            3 => Role::SUPERADMIN,
            _ => Role::SUPERDOG,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// Rank of a role set: the max rank among its roles, or 0 when empty.
pub fn rank<'a>(roles: impl IntoIterator<Item = &'a Role>) -> u8 {
    roles.into_iter().map(Role::rank).max().unwrap_or(0)
}

/// Whether an actor of `actor_rank` may manage `role`.
pub fn can_manage(actor_rank: u8, role: &Role) -> bool {
    actor_rank >= role.required_rank_to_manage()
}

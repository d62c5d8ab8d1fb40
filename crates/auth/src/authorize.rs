use std::collections::BTreeSet;

use warden_core::{AuthError, AuthResult};

use crate::permissions::{ObjectRolePermissions, Permission, RolePermissions, Scope, ScopedPermissions};
use crate::{Credentials, Role};

/// Authorize a caller against the permission matrix of one object type.
///
/// - No IO
/// - No panics
/// - Superadmins and above pass every check
impl RolePermissions {
    /// Whether the caller holds at least one of `permissions`, through
    /// rank, the `all` wildcard or one of its own roles.
    pub fn has_one_for(&self, credentials: &Credentials, permissions: &[Permission]) -> bool {
        if credentials.is_at_least_superadmin() {
            return true;
        }
        if self.has_one(&Role::ALL, permissions) {
            return true;
        }
        credentials
            .roles()
            .iter()
            .any(|role| self.has_one(role, permissions))
    }

    /// Resolve the broadest scope granted for one verb.
    ///
    /// Tiers are tried in order all → group → mine; the group tier only
    /// applies to objects of the caller's group, the mine tier only to the
    /// caller's own objects.
    pub fn check_scoped(
        &self,
        credentials: &Credentials,
        verb: ScopedPermissions,
        owner_id: Option<&str>,
        group_id: Option<&str>,
    ) -> AuthResult<Scope> {
        self.check_tiers(credentials, &[verb.all], verb, owner_id, group_id)
    }

    /// `check_scoped` where any of `all` grants the all tier.
    fn check_tiers(
        &self,
        credentials: &Credentials,
        all: &[Permission],
        verb: ScopedPermissions,
        owner_id: Option<&str>,
        group_id: Option<&str>,
    ) -> AuthResult<Scope> {
        if self.has_one_for(credentials, all) {
            return Ok(Scope::All);
        }
        if group_id == Some(credentials.group()) && self.has_one_for(credentials, &[verb.group]) {
            return Ok(Scope::Group);
        }
        if owner_id == Some(credentials.id_str()) && self.has_one_for(credentials, &[verb.mine]) {
            return Ok(Scope::Mine);
        }
        Err(AuthError::insufficient_credentials(credentials.to_string()))
    }

    pub fn check_create(
        &self,
        credentials: &Credentials,
        owner_id: Option<&str>,
        group_id: Option<&str>,
    ) -> AuthResult<Scope> {
        self.check_scoped(credentials, ScopedPermissions::CREATE, owner_id, group_id)
    }

    /// Searching a type implies reading any of its objects.
    pub fn check_read(
        &self,
        credentials: &Credentials,
        owner_id: Option<&str>,
        group_id: Option<&str>,
    ) -> AuthResult<Scope> {
        self.check_tiers(
            credentials,
            &[Permission::Read, Permission::Search],
            ScopedPermissions::READ,
            owner_id,
            group_id,
        )
    }

    pub fn check_update(
        &self,
        credentials: &Credentials,
        owner_id: Option<&str>,
        group_id: Option<&str>,
    ) -> AuthResult<Scope> {
        self.check_scoped(credentials, ScopedPermissions::UPDATE, owner_id, group_id)
    }

    pub fn check_delete(
        &self,
        credentials: &Credentials,
        owner_id: Option<&str>,
        group_id: Option<&str>,
    ) -> AuthResult<Scope> {
        self.check_scoped(credentials, ScopedPermissions::DELETE, owner_id, group_id)
    }

    pub fn check_permission(&self, credentials: &Credentials, permission: Permission) -> AuthResult<()> {
        if self.has_one_for(credentials, &[permission]) {
            Ok(())
        } else {
            Err(AuthError::insufficient_permissions(
                credentials.to_string(),
                format!("[{permission}] not granted"),
            ))
        }
    }

    pub fn check_search(&self, credentials: &Credentials) -> AuthResult<()> {
        self.check_permission(credentials, Permission::Search)
    }

    pub fn check_import(&self, credentials: &Credentials) -> AuthResult<()> {
        self.check_permission(credentials, Permission::ImportAll)
    }

    pub fn check_force_meta(&self, credentials: &Credentials) -> AuthResult<()> {
        self.check_permission(credentials, Permission::ForceMeta)
    }
}

impl ObjectRolePermissions {
    /// Object types on which the caller holds `permission`, sorted.
    pub fn access_list(&self, credentials: &Credentials, permission: Permission) -> BTreeSet<String> {
        self.iter()
            .filter(|(_, perms)| perms.has_one_for(credentials, &[permission]))
            .map(|(object_type, _)| object_type.to_string())
            .collect()
    }
}

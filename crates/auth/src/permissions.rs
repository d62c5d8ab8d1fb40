use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::Role;

/// Capability tag granted to a role on one object type.
///
/// The unscoped verb (`Read`, `Update`, ...) covers every object of the
/// type; the `Group` variant covers objects of the caller's group; the
/// `Mine` variant covers objects owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Create,
    CreateGroup,
    CreateMine,
    Read,
    ReadGroup,
    ReadMine,
    Update,
    UpdateGroup,
    UpdateMine,
    Delete,
    DeleteGroup,
    DeleteMine,
    Search,
    /// Force-assign ownership metadata (owner, group, timestamps).
    ForceMeta,
    /// Bulk import.
    ImportAll,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::Create,
        Permission::CreateGroup,
        Permission::CreateMine,
        Permission::Read,
        Permission::ReadGroup,
        Permission::ReadMine,
        Permission::Update,
        Permission::UpdateGroup,
        Permission::UpdateMine,
        Permission::Delete,
        Permission::DeleteGroup,
        Permission::DeleteMine,
        Permission::Search,
        Permission::ForceMeta,
        Permission::ImportAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Create => "create",
            Permission::CreateGroup => "createGroup",
            Permission::CreateMine => "createMine",
            Permission::Read => "read",
            Permission::ReadGroup => "readGroup",
            Permission::ReadMine => "readMine",
            Permission::Update => "update",
            Permission::UpdateGroup => "updateGroup",
            Permission::UpdateMine => "updateMine",
            Permission::Delete => "delete",
            Permission::DeleteGroup => "deleteGroup",
            Permission::DeleteMine => "deleteMine",
            Permission::Search => "search",
            Permission::ForceMeta => "forceMeta",
            Permission::ImportAll => "importAll",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth of a granted permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    All,
    Group,
    Mine,
}

/// The three scoped variants of one verb, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedPermissions {
    pub all: Permission,
    pub group: Permission,
    pub mine: Permission,
}

impl ScopedPermissions {
    pub const CREATE: Self = Self {
        all: Permission::Create,
        group: Permission::CreateGroup,
        mine: Permission::CreateMine,
    };
    pub const READ: Self = Self {
        all: Permission::Read,
        group: Permission::ReadGroup,
        mine: Permission::ReadMine,
    };
    pub const UPDATE: Self = Self {
        all: Permission::Update,
        group: Permission::UpdateGroup,
        mine: Permission::UpdateMine,
    };
    pub const DELETE: Self = Self {
        all: Permission::Delete,
        group: Permission::DeleteGroup,
        mine: Permission::DeleteMine,
    };
}

/// Role name → granted permissions, for one object type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePermissions(BTreeMap<Role, BTreeSet<Permission>>);

impl RolePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant, convenient for settings and tests.
    pub fn with(mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.put(role, permissions);
        self
    }

    /// Add permissions to a role (existing grants are kept).
    pub fn put(&mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) {
        self.0.entry(role).or_default().extend(permissions);
    }

    /// Remove permissions from a role; the role entry disappears once empty.
    pub fn remove(&mut self, role: &Role, permissions: impl IntoIterator<Item = Permission>) {
        if let Some(granted) = self.0.get_mut(role) {
            for p in permissions {
                granted.remove(&p);
            }
            if granted.is_empty() {
                self.0.remove(role);
            }
        }
    }

    pub fn clear_role(&mut self, role: &Role) {
        self.0.remove(role);
    }

    pub fn get(&self, role: &Role) -> Option<&BTreeSet<Permission>> {
        self.0.get(role)
    }

    /// Whether `role` holds at least one of `permissions`.
    pub fn has_one(&self, role: &Role, permissions: &[Permission]) -> bool {
        self.0
            .get(role)
            .is_some_and(|granted| permissions.iter().any(|p| granted.contains(p)))
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Object type name → [`RolePermissions`]. Tenant configuration data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRolePermissions(BTreeMap<String, RolePermissions>);

impl ObjectRolePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure lookup: never inserts anything.
    pub fn get(&self, object_type: &str) -> Option<&RolePermissions> {
        self.0.get(object_type)
    }

    /// Pure lookup falling back to an empty matrix (only superadmins pass).
    pub fn get_or_default(&self, object_type: &str) -> RolePermissions {
        self.0.get(object_type).cloned().unwrap_or_default()
    }

    /// Administrative setup: make sure `object_type` has an entry.
    pub fn ensure(&mut self, object_type: impl Into<String>) -> &mut RolePermissions {
        self.0.entry(object_type.into()).or_default()
    }

    pub fn put(&mut self, object_type: impl Into<String>, permissions: RolePermissions) {
        self.0.insert(object_type.into(), permissions);
    }

    pub fn remove(&mut self, object_type: &str) -> Option<RolePermissions> {
        self.0.remove(object_type)
    }

    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RolePermissions)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_distinct_permissions() {
        let names: BTreeSet<&str> = Permission::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn permissions_serialize_in_camel_case() {
        let json = serde_json::to_string(&Permission::UpdateGroup).unwrap();
        assert_eq!(json, "\"updateGroup\"");
        let back: Permission = serde_json::from_str("\"importAll\"").unwrap();
        assert_eq!(back, Permission::ImportAll);
    }

    #[test]
    fn has_one_matches_any_of_the_requested() {
        let perms = RolePermissions::new().with(Role::USER, [Permission::ReadMine]);
        assert!(perms.has_one(&Role::USER, &[Permission::Read, Permission::ReadMine]));
        assert!(!perms.has_one(&Role::USER, &[Permission::Read]));
        assert!(!perms.has_one(&Role::ADMIN, &[Permission::ReadMine]));
    }

    #[test]
    fn remove_drops_empty_role_entries() {
        let mut perms = RolePermissions::new().with(Role::USER, [Permission::Search]);
        perms.remove(&Role::USER, [Permission::Search]);
        assert!(perms.is_empty());
    }

    #[test]
    fn lookup_never_mutates() {
        let matrix = ObjectRolePermissions::new();
        assert!(matrix.get_or_default("message").is_empty());
        assert!(matrix.get("message").is_none());
        assert_eq!(matrix.object_types().count(), 0);
    }

    #[test]
    fn ensure_creates_entry_once() {
        let mut matrix = ObjectRolePermissions::new();
        matrix
            .ensure("message")
            .put(Role::ALL, [Permission::Search]);
        matrix.ensure("message");
        assert!(
            matrix
                .get("message")
                .unwrap()
                .has_one(&Role::ALL, &[Permission::Search])
        );
    }

    #[test]
    fn matrix_json_shape() {
        let mut matrix = ObjectRolePermissions::new();
        matrix.put(
            "message",
            RolePermissions::new().with(Role::USER, [Permission::Create, Permission::ReadMine]),
        );
        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "message": { "user": ["create", "readMine"] } })
        );
    }
}

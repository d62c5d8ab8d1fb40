//! `warden-auth` — pure identity and authorization domain (no IO).
//!
//! Tenant resolution, password hashing, the role hierarchy, the permission
//! matrix and the credentials aggregate. Storage and delivery live in
//! `warden-infra`.

pub mod authorize;
pub mod backend;
pub mod context;
pub mod credentials;
pub mod document;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod settings;
pub mod usernames;

pub use backend::{BackendTemplate, Resolved};
pub use context::RequestContext;
pub use credentials::Credentials;
pub use document::{CredentialsDocument, CredentialsView};
pub use password::PasswordHasher;
pub use permissions::{ObjectRolePermissions, Permission, RolePermissions, Scope, ScopedPermissions};
pub use roles::Role;
pub use session::Session;
pub use settings::CredentialsSettings;

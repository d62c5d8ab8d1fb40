//! Persistence ports for credentials and tenant settings.
//!
//! The core never talks to a storage engine directly: it loads a
//! [`Credentials`] aggregate, mutates it for the duration of one request,
//! and writes it back with the version it was loaded at.

use std::sync::Arc;

use warden_auth::{Credentials, CredentialsSettings, Role};
use warden_core::{AuthResult, CredentialsId, ExpectedVersion, TenantId};

pub mod in_memory;

pub use in_memory::{InMemoryCredentialsStore, InMemorySettingsStore};

/// One page of credentials.
#[derive(Debug, Clone, Default)]
pub struct CredentialsPage {
    pub total: u64,
    pub results: Vec<Credentials>,
}

/// Tenant-partitioned credentials storage.
///
/// ## Guarantees
/// - `username` is unique per tenant: `save` fails with `AlreadyExists`.
/// - `save` is a compare-and-set on the stored version: a stale
///   `ExpectedVersion` fails with `VersionConflict` and writes nothing.
/// - Tenants never see each other's credentials.
pub trait CredentialsStore: Send + Sync {
    fn get(&self, tenant: &TenantId, id: &CredentialsId) -> AuthResult<Option<Credentials>>;

    fn find_by_username(&self, tenant: &TenantId, username: &str) -> AuthResult<Option<Credentials>>;

    /// Every credentials holding a session with `token`. More than one
    /// result means the store is corrupted.
    fn find_by_session_token(&self, tenant: &TenantId, token: &str) -> AuthResult<Vec<Credentials>>;

    /// Persist `credentials`, returning the new stored version.
    fn save(
        &self,
        tenant: &TenantId,
        credentials: &Credentials,
        expected: ExpectedVersion,
    ) -> AuthResult<u64>;

    /// Returns `false` when nothing was stored under `id`.
    fn delete(&self, tenant: &TenantId, id: &CredentialsId) -> AuthResult<bool>;

    fn count_with_role(&self, tenant: &TenantId, role: &Role) -> AuthResult<u64>;

    /// Credentials sorted by username.
    fn list(&self, tenant: &TenantId, from: usize, size: usize) -> AuthResult<CredentialsPage>;
}

impl<S> CredentialsStore for Arc<S>
where
    S: CredentialsStore + ?Sized,
{
    fn get(&self, tenant: &TenantId, id: &CredentialsId) -> AuthResult<Option<Credentials>> {
        (**self).get(tenant, id)
    }

    fn find_by_username(&self, tenant: &TenantId, username: &str) -> AuthResult<Option<Credentials>> {
        (**self).find_by_username(tenant, username)
    }

    fn find_by_session_token(&self, tenant: &TenantId, token: &str) -> AuthResult<Vec<Credentials>> {
        (**self).find_by_session_token(tenant, token)
    }

    fn save(
        &self,
        tenant: &TenantId,
        credentials: &Credentials,
        expected: ExpectedVersion,
    ) -> AuthResult<u64> {
        (**self).save(tenant, credentials, expected)
    }

    fn delete(&self, tenant: &TenantId, id: &CredentialsId) -> AuthResult<bool> {
        (**self).delete(tenant, id)
    }

    fn count_with_role(&self, tenant: &TenantId, role: &Role) -> AuthResult<u64> {
        (**self).count_with_role(tenant, role)
    }

    fn list(&self, tenant: &TenantId, from: usize, size: usize) -> AuthResult<CredentialsPage> {
        (**self).list(tenant, from, size)
    }
}

/// Per-tenant credentials policy.
pub trait SettingsStore: Send + Sync {
    /// Saved settings, or the installation defaults.
    fn credentials_settings(&self, tenant: &TenantId) -> AuthResult<CredentialsSettings>;

    /// Implementations reject settings failing
    /// [`CredentialsSettings::validate`].
    fn save_credentials_settings(
        &self,
        tenant: &TenantId,
        settings: CredentialsSettings,
    ) -> AuthResult<()>;
}

impl<S> SettingsStore for Arc<S>
where
    S: SettingsStore + ?Sized,
{
    fn credentials_settings(&self, tenant: &TenantId) -> AuthResult<CredentialsSettings> {
        (**self).credentials_settings(tenant)
    }

    fn save_credentials_settings(
        &self,
        tenant: &TenantId,
        settings: CredentialsSettings,
    ) -> AuthResult<()> {
        (**self).save_credentials_settings(tenant, settings)
    }
}

use warden_core::TenantId;

use crate::Credentials;

/// Who is calling, on which tenant.
///
/// Built once per request after authentication and passed explicitly to
/// every orchestrator operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant: TenantId,
    pub credentials: Credentials,
}

impl RequestContext {
    pub fn new(tenant: TenantId, credentials: Credentials) -> Self {
        Self {
            tenant,
            credentials,
        }
    }

    pub fn guest(tenant: TenantId) -> Self {
        Self::new(tenant, Credentials::guest())
    }

    /// Whether the caller is the credentials identified by `id`.
    pub fn is_self(&self, id: &str) -> bool {
        self.credentials.id_str() == id
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use warden_auth::{Credentials, CredentialsDocument, CredentialsSettings, Role};
use warden_core::{AggregateRoot, AuthError, AuthResult, CredentialsId, ExpectedVersion, TenantId};

use super::{CredentialsPage, CredentialsStore, SettingsStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DocumentKey {
    tenant: TenantId,
    id: CredentialsId,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    source: JsonValue,
}

fn poisoned() -> AuthError {
    AuthError::internal("credentials store lock poisoned")
}

/// In-memory credentials store.
///
/// Keeps JSON documents, exactly as a document database would, so every
/// read goes through the explicit stored schema. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCredentialsStore {
    documents: RwLock<HashMap<DocumentKey, StoredDocument>>,
}

impl InMemoryCredentialsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(key: &DocumentKey, stored: &StoredDocument) -> AuthResult<Credentials> {
        let document: CredentialsDocument = serde_json::from_value(stored.source.clone())
            .map_err(|e| AuthError::internal(format!("corrupted credentials [{}]: {e}", key.id)))?;
        document.into_credentials(key.id.clone(), stored.version)
    }

    /// Decode every document of `tenant` matching `filter`.
    fn scan<F>(&self, tenant: &TenantId, filter: F) -> AuthResult<Vec<Credentials>>
    where
        F: Fn(&JsonValue) -> bool,
    {
        let documents = self.documents.read().map_err(|_| poisoned())?;
        documents
            .iter()
            .filter(|(key, stored)| key.tenant == *tenant && filter(&stored.source))
            .map(|(key, stored)| Self::decode(key, stored))
            .collect()
    }
}

impl CredentialsStore for InMemoryCredentialsStore {
    fn get(&self, tenant: &TenantId, id: &CredentialsId) -> AuthResult<Option<Credentials>> {
        let key = DocumentKey {
            tenant: tenant.clone(),
            id: id.clone(),
        };
        let documents = self.documents.read().map_err(|_| poisoned())?;
        documents
            .get(&key)
            .map(|stored| Self::decode(&key, stored))
            .transpose()
    }

    fn find_by_username(&self, tenant: &TenantId, username: &str) -> AuthResult<Option<Credentials>> {
        let mut found = self.scan(tenant, |source| source["username"] == username)?;
        if found.len() > 1 {
            return Err(AuthError::internal(format!(
                "username [{username}] is stored [{}] times",
                found.len()
            )));
        }
        Ok(found.pop())
    }

    fn find_by_session_token(&self, tenant: &TenantId, token: &str) -> AuthResult<Vec<Credentials>> {
        self.scan(tenant, |source| {
            source["sessions"]
                .as_array()
                .is_some_and(|sessions| sessions.iter().any(|s| s["access_token"] == token))
        })
    }

    fn save(
        &self,
        tenant: &TenantId,
        credentials: &Credentials,
        expected: ExpectedVersion,
    ) -> AuthResult<u64> {
        let source = serde_json::to_value(CredentialsDocument::from(credentials))
            .map_err(|e| AuthError::internal(format!("credentials encoding failed: {e}")))?;
        let key = DocumentKey {
            tenant: tenant.clone(),
            id: credentials.id().clone(),
        };

        let mut documents = self.documents.write().map_err(|_| poisoned())?;

        let current = documents.get(&key).map(|stored| stored.version);
        expected.check(current)?;

        let username_taken = documents.iter().any(|(k, stored)| {
            k.tenant == *tenant && k.id != key.id && stored.source["username"] == credentials.username()
        });
        if username_taken {
            return Err(AuthError::already_exists("credentials", credentials.username()));
        }

        let version = current.unwrap_or(0) + 1;
        documents.insert(key, StoredDocument { version, source });
        Ok(version)
    }

    fn delete(&self, tenant: &TenantId, id: &CredentialsId) -> AuthResult<bool> {
        let key = DocumentKey {
            tenant: tenant.clone(),
            id: id.clone(),
        };
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        Ok(documents.remove(&key).is_some())
    }

    fn count_with_role(&self, tenant: &TenantId, role: &Role) -> AuthResult<u64> {
        let documents = self.documents.read().map_err(|_| poisoned())?;
        let count = documents
            .iter()
            .filter(|(key, stored)| {
                key.tenant == *tenant
                    && stored.source["roles"]
                        .as_array()
                        .is_some_and(|roles| roles.iter().any(|r| *r == role.as_str()))
            })
            .count();
        Ok(count as u64)
    }

    fn list(&self, tenant: &TenantId, from: usize, size: usize) -> AuthResult<CredentialsPage> {
        let mut all = self.scan(tenant, |_| true)?;
        all.sort_by(|a, b| a.username().cmp(b.username()));
        Ok(CredentialsPage {
            total: all.len() as u64,
            results: all.into_iter().skip(from).take(size).collect(),
        })
    }
}

/// In-memory settings store falling back to installation defaults.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    defaults: CredentialsSettings,
    tenants: RwLock<HashMap<TenantId, CredentialsSettings>>,
}

impl InMemorySettingsStore {
    pub fn new(defaults: CredentialsSettings) -> Self {
        Self {
            defaults,
            tenants: RwLock::new(HashMap::new()),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn credentials_settings(&self, tenant: &TenantId) -> AuthResult<CredentialsSettings> {
        let tenants = self
            .tenants
            .read()
            .map_err(|_| AuthError::internal("settings store lock poisoned"))?;
        Ok(tenants.get(tenant).cloned().unwrap_or_else(|| self.defaults.clone()))
    }

    fn save_credentials_settings(
        &self,
        tenant: &TenantId,
        settings: CredentialsSettings,
    ) -> AuthResult<()> {
        settings.validate()?;
        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| AuthError::internal("settings store lock poisoned"))?;
        tenants.insert(tenant.clone(), settings);
        Ok(())
    }
}

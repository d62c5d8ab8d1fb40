//! Templated email delivery port.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use warden_auth::Role;
use warden_core::{AuthError, AuthResult, TenantId};

/// Template used for password reset emails.
pub const PASSWORD_RESET_EMAIL_TEMPLATE: &str = "password_reset_email_template";

/// A named, tenant-configured email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub name: String,
    /// Roles allowed to trigger this template (`all` for everyone).
    #[serde(default)]
    pub authorized_roles: BTreeSet<Role>,
    pub subject: String,
    pub body: String,
}

/// Delivers templated emails. Rendering happens on the sender side.
pub trait EmailSender: Send + Sync {
    fn template(&self, tenant: &TenantId, name: &str) -> AuthResult<Option<EmailTemplate>>;

    /// Send `template` to `to`, rendered with `model`. Returns a delivery
    /// receipt.
    fn send(
        &self,
        tenant: &TenantId,
        template: &EmailTemplate,
        to: &str,
        model: Map<String, JsonValue>,
    ) -> AuthResult<JsonValue>;
}

impl<S> EmailSender for Arc<S>
where
    S: EmailSender + ?Sized,
{
    fn template(&self, tenant: &TenantId, name: &str) -> AuthResult<Option<EmailTemplate>> {
        (**self).template(tenant, name)
    }

    fn send(
        &self,
        tenant: &TenantId,
        template: &EmailTemplate,
        to: &str,
        model: Map<String, JsonValue>,
    ) -> AuthResult<JsonValue> {
        (**self).send(tenant, template, to, model)
    }
}

/// One email accepted by [`InMemoryEmailSender`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub tenant: TenantId,
    pub template: String,
    pub to: String,
    pub model: Map<String, JsonValue>,
}

/// Records emails instead of sending them. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEmailSender {
    templates: RwLock<HashMap<(TenantId, String), EmailTemplate>>,
    sent: RwLock<Vec<SentEmail>>,
}

fn poisoned() -> AuthError {
    AuthError::internal("email sender lock poisoned")
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_template(&self, tenant: &TenantId, template: EmailTemplate) -> AuthResult<()> {
        let mut templates = self.templates.write().map_err(|_| poisoned())?;
        templates.insert((tenant.clone(), template.name.clone()), template);
        Ok(())
    }

    pub fn sent(&self) -> AuthResult<Vec<SentEmail>> {
        Ok(self.sent.read().map_err(|_| poisoned())?.clone())
    }
}

impl EmailSender for InMemoryEmailSender {
    fn template(&self, tenant: &TenantId, name: &str) -> AuthResult<Option<EmailTemplate>> {
        let templates = self.templates.read().map_err(|_| poisoned())?;
        Ok(templates.get(&(tenant.clone(), name.to_string())).cloned())
    }

    fn send(
        &self,
        tenant: &TenantId,
        template: &EmailTemplate,
        to: &str,
        model: Map<String, JsonValue>,
    ) -> AuthResult<JsonValue> {
        let mut sent = self.sent.write().map_err(|_| poisoned())?;
        sent.push(SentEmail {
            tenant: tenant.clone(),
            template: template.name.clone(),
            to: to.to_string(),
            model,
        });
        Ok(serde_json::json!({ "accepted": [to], "rejected": [] }))
    }
}
